//! Ingredient entity - Raw inputs whose cost drives everything downstream.
//!
//! An ingredient's `base_cost_per_unit` is either the quantity-weighted
//! average of its purchase entries or a manual override, and is the single
//! source every derived cost (variations, recipes, products, menus) is
//! recomputed from.

use super::enums::MeasurementClass;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    /// Unique identifier for the ingredient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the ingredient (e.g., "Flour")
    pub name: String,
    /// Measurement class all of this ingredient's quantities live in
    pub measurement_class: MeasurementClass,
    /// Unit the average price is quoted in (must be of the same class)
    pub price_unit_id: i64,
    /// Display price per price unit (= `base_cost_per_unit` x price unit factor)
    pub average_price: Decimal,
    /// Cost per base unit of the measurement class
    pub base_cost_per_unit: Decimal,
    /// When true, purchase entries no longer drive the average price
    pub manual_price_override: bool,
    /// Whether any processed variations exist for this ingredient
    pub has_variations: bool,
    /// When the ingredient was created
    pub created_at: DateTime,
    /// When the ingredient was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Ingredient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The unit the average price is quoted in
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::PriceUnitId",
        to = "super::unit::Column::Id"
    )]
    PriceUnit,
    /// Purchase history driving the weighted average
    #[sea_orm(has_many = "super::purchase_entry::Entity")]
    PurchaseEntries,
    /// Processed variations derived from this ingredient
    #[sea_orm(has_many = "super::variation::Entity")]
    Variations,
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceUnit.def()
    }
}

impl Related<super::purchase_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseEntries.def()
    }
}

impl Related<super::variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
