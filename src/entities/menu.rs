//! Menu entity - A priced listing of sellable items with a fixed-cost
//! apportionment policy.

use super::enums::ApportionmentPolicy;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    /// Unique identifier for the menu
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the menu (e.g., "Delivery")
    pub name: String,
    /// How workspace fixed costs are apportioned onto each sale
    pub apportionment_policy: ApportionmentPolicy,
    /// Percentage, flat currency amount, or estimated monthly unit sales,
    /// depending on the policy
    pub policy_value: Decimal,
    /// When the menu was created
    pub created_at: DateTime,
    /// When the menu was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Menu and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Items listed on this menu
    #[sea_orm(has_many = "super::menu_item::Entity")]
    Items,
    /// Fees charged on this menu's sales
    #[sea_orm(has_many = "super::menu_fee::Entity")]
    Fees,
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::menu_fee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
