//! Menu item entity - A sellable listing with its cached cost and margin.
//!
//! The cached fields are recomputed by the menu pricing calculator whenever
//! the underlying cost cascades or the menu's fees/policy change.

use super::enums::MenuEntryKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    /// Unique identifier for the menu item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Menu this item is listed on
    pub menu_id: i64,
    /// Kind of entity being sold
    pub item_kind: MenuEntryKind,
    /// Id of the referenced product/ingredient/recipe
    pub item_id: i64,
    /// Sale price asked on the menu
    pub sale_price: Decimal,
    /// Cached item cost + fees + apportioned fixed cost
    pub total_cost: Decimal,
    /// Cached `sale_price` - `total_cost`
    pub margin_value: Decimal,
    /// Cached `margin_value` / `sale_price` x 100 (0 when sale price <= 0)
    pub margin_percentage: Decimal,
    /// When the listing was last repriced
    pub updated_at: DateTime,
}

/// Defines relationships between `MenuItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one menu
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
