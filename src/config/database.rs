//! Database configuration module for the costing engine.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary tables
//! based on the entity definitions. The module uses `SeaORM`'s `Schema::create_table_from_entity`
//! method to automatically generate SQL statements from the entity models, ensuring that the
//! database schema matches the Rust struct definitions without requiring manual SQL.

use crate::entities::{
    FixedCost, Ingredient, Menu, MenuFee, MenuItem, Product, ProductComposition, PurchaseEntry,
    Recipe, RecipeItem, RecipeStep, Unit, Variation, WorkspaceSetting,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/foodcost.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database.
///
/// The explicit `url` wins; otherwise the `DATABASE_URL` environment variable
/// is consulted, falling back to a default local `SQLite` file. This function
/// handles connection errors and provides a clean interface for database
/// access throughout the engine.
pub async fn create_connection(url: Option<&str>) -> Result<DatabaseConnection> {
    let database_url = url.map_or_else(get_database_url, ToString::to_string);

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// This function uses the `DeriveEntityModel` macros to automatically generate proper SQL
/// statements for table creation, ensuring the database schema matches the Rust struct definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    db.execute(builder.build(&schema.create_table_from_entity(Unit)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Ingredient)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(PurchaseEntry)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Variation)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Recipe)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(RecipeItem)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(RecipeStep)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Product)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(ProductComposition)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Menu)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(MenuItem)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(MenuFee)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(FixedCost)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(WorkspaceSetting)))
        .await?;

    Ok(())
}
