//! Cost ledger business logic - Maintains each ingredient's cost per base unit.
//!
//! An ingredient's `base_cost_per_unit` comes either from a manual override
//! or from the quantity-weighted average of its purchase entries. Entries are
//! history: they are summed on every recompute and never patch the cost
//! directly. Every successful recompute triggers the cascade so downstream
//! recipes, products, and menu listings stay consistent.

use crate::{
    core::{cascade, cascade::CostNode, units},
    entities::{
        Ingredient, PurchaseEntry, enums::MeasurementClass, ingredient, purchase_entry,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::debug;

/// Creates a new ingredient, performing input validation.
///
/// The price unit must belong to the ingredient's measurement class. The
/// ingredient starts with a zero cost; purchase entries or a manual price
/// give it one.
pub async fn create_ingredient(
    db: &DatabaseConnection,
    name: String,
    measurement_class: MeasurementClass,
    price_unit_id: i64,
) -> Result<ingredient::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Ingredient name cannot be empty".to_string(),
        });
    }

    let price_unit = units::get_unit(db, price_unit_id).await?;
    units::ensure_class(&price_unit, measurement_class)?;

    let now = chrono::Utc::now().naive_utc();
    let ingredient = ingredient::ActiveModel {
        name: Set(name.trim().to_string()),
        measurement_class: Set(measurement_class),
        price_unit_id: Set(price_unit_id),
        average_price: Set(Decimal::ZERO),
        base_cost_per_unit: Set(Decimal::ZERO),
        manual_price_override: Set(false),
        has_variations: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    ingredient.insert(db).await.map_err(Into::into)
}

/// Retrieves a specific ingredient by its unique ID.
pub async fn get_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i64,
) -> Result<Option<ingredient::Model>> {
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all ingredients, ordered alphabetically by name.
pub async fn get_all_ingredients(db: &DatabaseConnection) -> Result<Vec<ingredient::Model>> {
    Ingredient::find()
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches an ingredient or fails with `NotFound`.
pub(crate) async fn require_ingredient<C: ConnectionTrait>(
    db: &C,
    ingredient_id: i64,
) -> Result<ingredient::Model> {
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "ingredient",
            id: ingredient_id,
        })
}

/// Records a purchase entry and recomputes the ingredient's weighted average.
///
/// When the ingredient carries a manual price override the entry is still
/// recorded for audit but does not move the price. The recompute and the full
/// downstream cascade run inside one transaction.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive or the total price is negative
/// - The entry's unit belongs to a different measurement class than the ingredient
/// - The ingredient or unit does not exist
pub async fn record_entry(
    db: &DatabaseConnection,
    ingredient_id: i64,
    purchase_date: NaiveDate,
    quantity: Decimal,
    unit_id: i64,
    total_price: Decimal,
) -> Result<(purchase_entry::Model, ingredient::Model)> {
    validate_entry_values(quantity, total_price)?;

    let txn = db.begin().await?;

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    let unit = units::get_unit(&txn, unit_id).await?;
    units::ensure_class(&unit, ingredient.measurement_class)?;

    let entry = purchase_entry::ActiveModel {
        ingredient_id: Set(ingredient_id),
        purchase_date: Set(purchase_date),
        quantity: Set(quantity),
        unit_id: Set(unit_id),
        total_price: Set(total_price),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    let entry = entry.insert(&txn).await?;

    if refresh_ingredient_cost(&txn, ingredient_id).await?.is_some() {
        cascade::propagate(&txn, CostNode::Ingredient(ingredient_id)).await?;
    }

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    txn.commit().await?;

    Ok((entry, ingredient))
}

/// Edits an existing purchase entry and recomputes the weighted average.
pub async fn update_entry(
    db: &DatabaseConnection,
    entry_id: i64,
    purchase_date: NaiveDate,
    quantity: Decimal,
    unit_id: i64,
    total_price: Decimal,
) -> Result<ingredient::Model> {
    validate_entry_values(quantity, total_price)?;

    let txn = db.begin().await?;

    let entry = PurchaseEntry::find_by_id(entry_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "purchase entry",
            id: entry_id,
        })?;
    let ingredient = require_ingredient(&txn, entry.ingredient_id).await?;
    let unit = units::get_unit(&txn, unit_id).await?;
    units::ensure_class(&unit, ingredient.measurement_class)?;

    let ingredient_id = entry.ingredient_id;
    let mut entry: purchase_entry::ActiveModel = entry.into();
    entry.purchase_date = Set(purchase_date);
    entry.quantity = Set(quantity);
    entry.unit_id = Set(unit_id);
    entry.total_price = Set(total_price);
    entry.update(&txn).await?;

    if refresh_ingredient_cost(&txn, ingredient_id).await?.is_some() {
        cascade::propagate(&txn, CostNode::Ingredient(ingredient_id)).await?;
    }

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    txn.commit().await?;

    Ok(ingredient)
}

/// Removes a purchase entry and recomputes the weighted average.
///
/// Removing the last entry leaves the prior cost in place rather than zeroing
/// it, so a deliberate value is never discarded.
pub async fn remove_entry(db: &DatabaseConnection, entry_id: i64) -> Result<ingredient::Model> {
    let txn = db.begin().await?;

    let entry = PurchaseEntry::find_by_id(entry_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "purchase entry",
            id: entry_id,
        })?;
    let ingredient_id = entry.ingredient_id;
    entry.delete(&txn).await?;

    if refresh_ingredient_cost(&txn, ingredient_id).await?.is_some() {
        cascade::propagate(&txn, CostNode::Ingredient(ingredient_id)).await?;
    }

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    txn.commit().await?;

    Ok(ingredient)
}

/// Sets a manual price per price unit, detaching the ingredient's cost from
/// its purchase history until the override is cleared.
pub async fn set_manual_price(
    db: &DatabaseConnection,
    ingredient_id: i64,
    price_per_price_unit: Decimal,
) -> Result<ingredient::Model> {
    if price_per_price_unit < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Price cannot be negative (got {price_per_price_unit})"),
        });
    }

    let txn = db.begin().await?;

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    let price_unit = units::get_unit(&txn, ingredient.price_unit_id).await?;
    let base_cost = price_per_price_unit
        .checked_div(price_unit.conversion_factor)
        .ok_or(Error::DivisionByZero { ingredient_id })?;

    let mut active: ingredient::ActiveModel = ingredient.into();
    active.manual_price_override = Set(true);
    active.average_price = Set(price_per_price_unit);
    active.base_cost_per_unit = Set(base_cost);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&txn).await?;

    debug!(ingredient_id, %base_cost, "manual price set");
    cascade::propagate(&txn, CostNode::Ingredient(ingredient_id)).await?;

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    txn.commit().await?;

    Ok(ingredient)
}

/// Clears a manual price override and re-derives the cost from the purchase
/// history. With no entries the last value stays in place.
pub async fn clear_manual_price(
    db: &DatabaseConnection,
    ingredient_id: i64,
) -> Result<ingredient::Model> {
    let txn = db.begin().await?;

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    let mut active: ingredient::ActiveModel = ingredient.into();
    active.manual_price_override = Set(false);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&txn).await?;

    if refresh_ingredient_cost(&txn, ingredient_id).await?.is_some() {
        cascade::propagate(&txn, CostNode::Ingredient(ingredient_id)).await?;
    }

    let ingredient = require_ingredient(&txn, ingredient_id).await?;
    txn.commit().await?;

    Ok(ingredient)
}

/// Recomputes `base_cost_per_unit` as the quantity-weighted average of the
/// ingredient's purchase entries, and `average_price` as its projection into
/// the price unit.
///
/// Returns the new base cost when a recompute was written, `None` when the
/// cost was left untouched (manual override, or no entries to average).
///
/// # Errors
/// Returns `DivisionByZero` when entries exist but their total base quantity
/// is zero; the prior value is left unchanged.
pub(crate) async fn refresh_ingredient_cost<C: ConnectionTrait>(
    db: &C,
    ingredient_id: i64,
) -> Result<Option<Decimal>> {
    let ingredient = require_ingredient(db, ingredient_id).await?;
    if ingredient.manual_price_override {
        return Ok(None);
    }

    let entries = PurchaseEntry::find()
        .filter(purchase_entry::Column::IngredientId.eq(ingredient_id))
        .all(db)
        .await?;
    if entries.is_empty() {
        return Ok(None);
    }

    let mut total_paid = Decimal::ZERO;
    let mut total_base_quantity = Decimal::ZERO;
    for entry in &entries {
        let unit = units::get_unit(db, entry.unit_id).await?;
        total_paid += entry.total_price;
        total_base_quantity += units::to_base_with(&unit, entry.quantity);
    }

    let base_cost = total_paid
        .checked_div(total_base_quantity)
        .ok_or(Error::DivisionByZero { ingredient_id })?;

    let price_unit = units::get_unit(db, ingredient.price_unit_id).await?;
    let average_price = base_cost * price_unit.conversion_factor;

    let mut active: ingredient::ActiveModel = ingredient.into();
    active.base_cost_per_unit = Set(base_cost);
    active.average_price = Set(average_price);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await?;

    debug!(ingredient_id, %base_cost, "ingredient cost recomputed");
    Ok(Some(base_cost))
}

fn validate_entry_values(quantity: Decimal, total_price: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Entry quantity must be positive (got {quantity})"),
        });
    }
    if total_price < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Entry total price cannot be negative (got {total_price})"),
        });
    }
    Ok(())
}
