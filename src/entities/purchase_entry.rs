//! Purchase entry entity - Immutable purchase history for an ingredient.
//!
//! Entries never set an ingredient's cost directly: their quantity-weighted
//! sum drives the recompute in the cost ledger, unless the ingredient carries
//! a manual price override (entries are then kept for audit only).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ingredient this purchase belongs to
    pub ingredient_id: i64,
    /// Date of the purchase
    pub purchase_date: Date,
    /// Quantity bought, in `unit_id` units
    pub quantity: Decimal,
    /// Unit the quantity was measured in
    pub unit_id: i64,
    /// Total currency paid for the whole quantity
    pub total_price: Decimal,
    /// When the entry was recorded
    pub created_at: DateTime,
}

/// Defines relationships between `PurchaseEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
