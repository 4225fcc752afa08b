//! Shared test utilities for the costing engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{ledger, recipe, units},
    entities,
    entities::enums::{ItemKind, MeasurementClass},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Decimal literal helper so test values read like money.
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

/// A fixed purchase date; entry dates never affect the math.
pub fn test_date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid test date")
}

/// The standard seeded units, one bundle per measurement class.
pub struct TestUnits {
    pub gram: entities::unit::Model,
    pub kilogram: entities::unit::Model,
    pub milliliter: entities::unit::Model,
    pub liter: entities::unit::Model,
    pub count: entities::unit::Model,
}

/// Seeds gram/kilogram, milliliter/liter, and a count unit.
pub async fn seed_units(db: &DatabaseConnection) -> Result<TestUnits> {
    let gram = units::create_unit(
        db,
        "Gram".to_string(),
        "g".to_string(),
        MeasurementClass::Weight,
        Decimal::ONE,
        true,
    )
    .await?;
    let kilogram = units::create_unit(
        db,
        "Kilogram".to_string(),
        "kg".to_string(),
        MeasurementClass::Weight,
        Decimal::from(1000),
        false,
    )
    .await?;
    let milliliter = units::create_unit(
        db,
        "Milliliter".to_string(),
        "ml".to_string(),
        MeasurementClass::Volume,
        Decimal::ONE,
        true,
    )
    .await?;
    let liter = units::create_unit(
        db,
        "Liter".to_string(),
        "L".to_string(),
        MeasurementClass::Volume,
        Decimal::from(1000),
        false,
    )
    .await?;
    let count = units::create_unit(
        db,
        "Unit".to_string(),
        "un".to_string(),
        MeasurementClass::Count,
        Decimal::ONE,
        true,
    )
    .await?;

    Ok(TestUnits {
        gram,
        kilogram,
        milliliter,
        liter,
        count,
    })
}

/// Sets up a complete test environment with the standard units.
/// Returns (db, units) for common test scenarios.
pub async fn setup_with_units() -> Result<(DatabaseConnection, TestUnits)> {
    let db = setup_test_db().await?;
    let units = seed_units(&db).await?;
    Ok((db, units))
}

/// Creates a weight ingredient priced per kilogram, with no cost yet.
pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    units: &TestUnits,
) -> Result<entities::ingredient::Model> {
    ledger::create_ingredient(
        db,
        name.to_string(),
        MeasurementClass::Weight,
        units.kilogram.id,
    )
    .await
}

/// Creates a weight ingredient with a manual price per kilogram.
pub async fn ingredient_with_manual_price(
    db: &DatabaseConnection,
    name: &str,
    units: &TestUnits,
    price_per_kilogram: &str,
) -> Result<entities::ingredient::Model> {
    let ingredient = create_test_ingredient(db, name, units).await?;
    ledger::set_manual_price(db, ingredient.id, dec(price_per_kilogram)).await
}

/// Creates a volume ingredient with a manual price per liter.
pub async fn volume_ingredient_with_manual_price(
    db: &DatabaseConnection,
    name: &str,
    units: &TestUnits,
    price_per_liter: &str,
) -> Result<entities::ingredient::Model> {
    let ingredient = ledger::create_ingredient(
        db,
        name.to_string(),
        MeasurementClass::Volume,
        units.liter.id,
    )
    .await?;
    ledger::set_manual_price(db, ingredient.id, dec(price_per_liter)).await
}

/// Appends a gram-measured ingredient line to a recipe and returns the
/// recomputed recipe.
pub async fn add_recipe_ingredient(
    db: &DatabaseConnection,
    owner: &entities::recipe::Model,
    ingredient: &entities::ingredient::Model,
    grams: i64,
    units: &TestUnits,
) -> Result<entities::recipe::Model> {
    recipe::upsert_recipe_item(
        db,
        owner.id,
        None,
        ItemKind::Ingredient,
        ingredient.id,
        Decimal::from(grams),
        units.gram.id,
    )
    .await
}
