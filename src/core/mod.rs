//! Core business logic - framework-agnostic costing engine operations.
//!
//! Each module owns one concern; mutations validate, write, recompute the
//! owning aggregate, and cascade inside a single transaction.

/// Composite cost aggregation shared by recipes and products
pub mod aggregate;
/// Dependency graph, cycle rejection, and cascading recomputation
pub mod cascade;
/// Ingredient cost ledger: purchase entries and weighted averages
pub mod ledger;
/// Menu pricing: fees, fixed-cost apportionment, and margins
pub mod menu;
/// Products and their composition lines
pub mod product;
/// Recipes, their line items, and preparation steps
pub mod recipe;
/// Workspace settings such as the hourly labor rate
pub mod settings;
/// Read-only what-if simulation of ingredient price changes
pub mod simulate;
/// Measurement units and base-unit conversion
pub mod units;
/// Processed variations of an ingredient
pub mod variation;
