//! Menu fee entity - A fixed or percentage-of-sale charge on a menu.

use super::enums::FeeKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu fee database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_fees")]
pub struct Model {
    /// Unique identifier for the fee
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Menu this fee applies to
    pub menu_id: i64,
    /// Name of the fee (e.g., "Delivery app commission")
    pub name: String,
    /// Whether the fee is flat or a percentage of the sale price
    pub kind: FeeKind,
    /// Currency amount or percentage, depending on `kind`
    pub value: Decimal,
    /// Inactive fees are kept but not charged
    pub active: bool,
}

/// Defines relationships between `MenuFee` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each fee belongs to one menu
    #[sea_orm(
        belongs_to = "super::menu::Entity",
        from = "Column::MenuId",
        to = "super::menu::Column::Id"
    )]
    Menu,
}

impl Related<super::menu::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Menu.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
