//! Recipe entity - A preparation that yields a number of portions.
//!
//! `total_cost`, `labor_cost` and `cost_per_portion` are caches maintained by
//! the composite aggregator; they are never patched in place from other call
//! sites.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the recipe (e.g., "Dough")
    pub name: String,
    /// How many yield units one batch produces
    pub yield_quantity: Decimal,
    /// Unit the yield is measured in
    pub yield_unit_id: i64,
    /// Preparation time in minutes, charged against the workspace labor rate
    pub prep_time_minutes: i32,
    /// Cached sum of the recipe items' calculated costs
    pub total_cost: Decimal,
    /// Cached prep-time charge (prep minutes / 60 x labor rate per hour)
    pub labor_cost: Decimal,
    /// Cached (`total_cost` + `labor_cost`) / `yield_quantity`
    pub cost_per_portion: Decimal,
    /// When the recipe was created
    pub created_at: DateTime,
    /// When the recipe was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Unit the yield is measured in
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::YieldUnitId",
        to = "super::unit::Column::Id"
    )]
    YieldUnit,
    /// Ordered cost-bearing line items
    #[sea_orm(has_many = "super::recipe_item::Entity")]
    Items,
    /// Ordered free-text preparation steps
    #[sea_orm(has_many = "super::recipe_step::Entity")]
    Steps,
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::YieldUnit.def()
    }
}

impl Related<super::recipe_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::recipe_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
