//! Unit entity - Measurement units and their conversion to the class base unit.
//!
//! Every quantity in a cost formula is converted to its measurement class's
//! base unit (gram, milliliter, or a single item) through the factor stored
//! here. Base units have factor 1 and are immutable once seeded.

use super::enums::MeasurementClass;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Unit database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "units")]
pub struct Model {
    /// Unique identifier for the unit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Kilogram")
    pub name: String,
    /// Short symbol (e.g., "kg")
    pub abbreviation: String,
    /// Measurement class this unit belongs to
    pub measurement_class: MeasurementClass,
    /// How many base units one of this unit equals (the base unit itself has factor 1)
    pub conversion_factor: Decimal,
    /// Base units cannot be edited or deleted
    pub is_base: bool,
}

/// `Unit` is referenced by other entities but owns nothing itself
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
