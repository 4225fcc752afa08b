//! Unified error types for the costing engine.
//!
//! Every failure here is a local validation or lookup failure surfaced
//! synchronously to the caller. A rejected mutation aborts only the operation
//! that produced it: no cascade is started and previously converged cached
//! costs are left intact.

use crate::entities::enums::MeasurementClass;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unit not found: {unit_id}")]
    UnitNotFound { unit_id: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Incompatible measurement class: expected {expected:?}, got {found:?}")]
    IncompatibleMeasurementClass {
        expected: MeasurementClass,
        found: MeasurementClass,
    },

    #[error("Invalid yield input: input base quantity must be positive (got {input_base})")]
    InvalidYieldInput { input_base: Decimal },

    #[error("Invalid yield quantity: {yield_quantity}")]
    InvalidYield { yield_quantity: Decimal },

    #[error("Total base quantity of purchase entries for ingredient {ingredient_id} is zero")]
    DivisionByZero { ingredient_id: i64 },

    #[error("{entity} {id} cannot contain itself")]
    SelfReference { entity: &'static str, id: i64 },

    #[error("Adding this item would create a composition cycle through {entity} {id}")]
    CompositionCycle { entity: &'static str, id: i64 },

    #[error("No price can preserve a margin of {margin_percentage}%")]
    InvalidMargin { margin_percentage: Decimal },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
