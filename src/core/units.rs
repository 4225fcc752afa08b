//! Unit conversion business logic.
//!
//! Every quantity that enters a cost formula is first converted to the base
//! unit of its measurement class through the factors stored on the `unit`
//! table. Conversion itself is pure lookup and arithmetic; units of different
//! classes are never compared or mixed, and callers check class compatibility
//! before converting.

use crate::{
    entities::{
        Ingredient, ProductComposition, PurchaseEntry, Recipe, RecipeItem, Unit, Variation,
        enums::MeasurementClass, ingredient, product_composition, purchase_entry, recipe,
        recipe_item, unit, variation,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};

/// Retrieves a unit by id, failing with `UnitNotFound` when it is missing.
pub async fn get_unit<C: ConnectionTrait>(db: &C, unit_id: i64) -> Result<unit::Model> {
    Unit::find_by_id(unit_id)
        .one(db)
        .await?
        .ok_or(Error::UnitNotFound { unit_id })
}

/// Converts a quantity measured in `unit` into the base unit of its class.
#[must_use]
pub fn to_base_with(unit: &unit::Model, quantity: Decimal) -> Decimal {
    quantity * unit.conversion_factor
}

/// Converts a quantity measured in the given unit into the base unit of that
/// unit's class. No side effects.
pub async fn to_base<C: ConnectionTrait>(
    db: &C,
    quantity: Decimal,
    unit_id: i64,
) -> Result<Decimal> {
    let unit = get_unit(db, unit_id).await?;
    Ok(to_base_with(&unit, quantity))
}

/// Checks that a unit belongs to the expected measurement class.
///
/// # Errors
/// Returns `IncompatibleMeasurementClass` when the classes differ.
pub fn ensure_class(unit: &unit::Model, expected: MeasurementClass) -> Result<()> {
    if unit.measurement_class == expected {
        Ok(())
    } else {
        Err(Error::IncompatibleMeasurementClass {
            expected,
            found: unit.measurement_class,
        })
    }
}

/// Retrieves all units of one measurement class, base unit first.
pub async fn get_units_of_class(
    db: &DatabaseConnection,
    class: MeasurementClass,
) -> Result<Vec<unit::Model>> {
    Unit::find()
        .filter(unit::Column::MeasurementClass.eq(class))
        .order_by_desc(unit::Column::IsBase)
        .order_by_asc(unit::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new unit, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The conversion factor is not positive
/// - The unit is marked as base but its factor is not exactly 1
pub async fn create_unit(
    db: &DatabaseConnection,
    name: String,
    abbreviation: String,
    measurement_class: MeasurementClass,
    conversion_factor: Decimal,
    is_base: bool,
) -> Result<unit::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Unit name cannot be empty".to_string(),
        });
    }

    if conversion_factor <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Conversion factor must be positive (got {conversion_factor})"),
        });
    }

    if is_base && conversion_factor != Decimal::ONE {
        return Err(Error::Validation {
            message: "A base unit must have a conversion factor of exactly 1".to_string(),
        });
    }

    let unit = unit::ActiveModel {
        name: Set(name.trim().to_string()),
        abbreviation: Set(abbreviation.trim().to_string()),
        measurement_class: Set(measurement_class),
        conversion_factor: Set(conversion_factor),
        is_base: Set(is_base),
        ..Default::default()
    };
    unit.insert(db).await.map_err(Into::into)
}

/// Deletes a unit.
///
/// Base units are immutable and can never be deleted. A unit that is still
/// referenced anywhere (ingredient price unit, purchase entry, variation
/// output, recipe yield, or a line item) is also protected, since deleting it
/// would strand quantities without a conversion.
pub async fn delete_unit(db: &DatabaseConnection, unit_id: i64) -> Result<()> {
    let unit = get_unit(db, unit_id).await?;

    if unit.is_base {
        return Err(Error::Validation {
            message: format!("Base unit '{}' cannot be deleted", unit.name),
        });
    }

    if unit_in_use(db, unit_id).await? {
        return Err(Error::Validation {
            message: format!("Unit '{}' is still in use and cannot be deleted", unit.name),
        });
    }

    unit.delete(db).await?;
    Ok(())
}

/// Whether any row anywhere still references this unit.
async fn unit_in_use<C: ConnectionTrait>(db: &C, unit_id: i64) -> Result<bool> {
    if Ingredient::find()
        .filter(ingredient::Column::PriceUnitId.eq(unit_id))
        .count(db)
        .await?
        > 0
    {
        return Ok(true);
    }
    if PurchaseEntry::find()
        .filter(purchase_entry::Column::UnitId.eq(unit_id))
        .count(db)
        .await?
        > 0
    {
        return Ok(true);
    }
    if Variation::find()
        .filter(variation::Column::UnitId.eq(unit_id))
        .count(db)
        .await?
        > 0
    {
        return Ok(true);
    }
    if Recipe::find()
        .filter(recipe::Column::YieldUnitId.eq(unit_id))
        .count(db)
        .await?
        > 0
    {
        return Ok(true);
    }
    if RecipeItem::find()
        .filter(recipe_item::Column::UnitId.eq(unit_id))
        .count(db)
        .await?
        > 0
    {
        return Ok(true);
    }
    let compositions = ProductComposition::find()
        .filter(product_composition::Column::UnitId.eq(unit_id))
        .count(db)
        .await?;
    Ok(compositions > 0)
}
