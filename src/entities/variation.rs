//! Variation entity - A processed yield of an ingredient (e.g., "deboned").
//!
//! `calculated_cost` is a cache: it is always re-derivable as
//! `ingredient.base_cost_per_unit / (yield_percentage / 100)`, expressed per
//! base unit of the output unit's class.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Variation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variations")]
pub struct Model {
    /// Unique identifier for the variation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ingredient this variation is derived from
    pub ingredient_id: i64,
    /// Name of the processing step (e.g., "Peeled")
    pub name: String,
    /// Output base quantity / input base quantity x 100; may exceed 100
    pub yield_percentage: Decimal,
    /// Output unit the processed result is measured in
    pub unit_id: i64,
    /// Cached cost per base unit of the output unit's class
    pub calculated_cost: Decimal,
    /// When the variation was created
    pub created_at: DateTime,
    /// When the variation was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Variation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each variation belongs to one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
    /// Output unit
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::UnitId",
        to = "super::unit::Column::Id"
    )]
    Unit,
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
