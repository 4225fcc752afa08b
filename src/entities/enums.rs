//! String-backed enums shared across entity definitions.
//!
//! Each discriminated "type" column in the schema is modeled as an
//! `ActiveEnum` rather than a free-form string, so a line item can only ever
//! point at one of the known referenced kinds.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Physical dimension a unit measures. Units of different classes are never
/// compared or mixed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MeasurementClass {
    /// Base unit: gram
    #[sea_orm(string_value = "weight")]
    Weight,
    /// Base unit: milliliter
    #[sea_orm(string_value = "volume")]
    Volume,
    /// Base unit: a single countable item
    #[sea_orm(string_value = "count")]
    Count,
}

/// Kind of entity a recipe item or product composition line references.
///
/// Recipe items never use the `Product` kind; product compositions may use
/// all four.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ItemKind {
    #[sea_orm(string_value = "ingredient")]
    Ingredient,
    #[sea_orm(string_value = "variation")]
    Variation,
    #[sea_orm(string_value = "recipe")]
    Recipe,
    #[sea_orm(string_value = "product")]
    Product,
}

/// Kind of entity a menu listing references. Variations are never listed on a
/// menu directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MenuEntryKind {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "ingredient")]
    Ingredient,
    #[sea_orm(string_value = "recipe")]
    Recipe,
}

/// How a menu fee is charged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum FeeKind {
    /// Flat currency amount per sale
    #[sea_orm(string_value = "fixed")]
    Fixed,
    /// Percentage of the sale price
    #[sea_orm(string_value = "percentage")]
    Percentage,
}

/// Policy dividing the workspace's monthly fixed costs across menu item sales.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ApportionmentPolicy {
    /// Charge `policy_value` percent of each sale
    #[sea_orm(string_value = "percentage_of_sale")]
    PercentageOfSale,
    /// Charge `policy_value` currency flat per item sold
    #[sea_orm(string_value = "fixed_per_product")]
    FixedPerProduct,
    /// Divide the total active fixed costs by `policy_value` estimated
    /// monthly unit sales
    #[sea_orm(string_value = "proportional_to_sales")]
    ProportionalToSales,
}
