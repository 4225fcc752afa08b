//! Variation deriver business logic - Costs processed yields of an ingredient.
//!
//! A variation records how much usable output a processing step (peeling,
//! deboning, reducing) extracts from a measured input, as a yield percentage.
//! Its cached cost is the ingredient's base cost divided by that yield, so a
//! 50% yield doubles the cost per base unit. Yields above 100% (e.g.
//! hydration gain) are legitimate.

use crate::{
    core::{cascade, cascade::CostNode, ledger, units},
    entities::{
        ProductComposition, RecipeItem, Variation, enums::ItemKind, ingredient,
        product_composition, recipe_item, variation,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};

/// Yield percentage from a measured input/output pair, both already converted
/// to base units.
///
/// # Errors
/// Returns `InvalidYieldInput` when the input base quantity is not positive.
pub fn yield_percentage(input_base: Decimal, output_base: Decimal) -> Result<Decimal> {
    if input_base <= Decimal::ZERO {
        return Err(Error::InvalidYieldInput { input_base });
    }
    Ok(output_base / input_base * Decimal::ONE_HUNDRED)
}

/// Cost per output base unit for a given ingredient base cost and yield.
pub(crate) fn derive_cost(base_cost_per_unit: Decimal, yield_pct: Decimal) -> Result<Decimal> {
    base_cost_per_unit
        .checked_div(yield_pct / Decimal::ONE_HUNDRED)
        .ok_or(Error::InvalidYieldInput {
            input_base: yield_pct,
        })
}

/// Retrieves all variations of an ingredient, ordered alphabetically by name.
pub async fn get_variations_for_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i64,
) -> Result<Vec<variation::Model>> {
    Variation::find()
        .filter(variation::Column::IngredientId.eq(ingredient_id))
        .order_by_asc(variation::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches a variation or fails with `NotFound`.
pub(crate) async fn require_variation<C: ConnectionTrait>(
    db: &C,
    variation_id: i64,
) -> Result<variation::Model> {
    Variation::find_by_id(variation_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "variation",
            id: variation_id,
        })
}

/// Creates a variation from a measured input/output pair.
///
/// The input is measured in the ingredient's measurement class; the output
/// unit may belong to a different class (weight in, volume out is fine) and
/// becomes the variation's stored unit.
///
/// # Errors
/// Returns an error if:
/// - The name is empty, or either quantity is not positive
/// - The input unit's class differs from the ingredient's
/// - The ingredient or a unit does not exist
pub async fn create_variation(
    db: &DatabaseConnection,
    ingredient_id: i64,
    name: String,
    input_quantity: Decimal,
    input_unit_id: i64,
    output_quantity: Decimal,
    output_unit_id: i64,
) -> Result<variation::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Variation name cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let ingredient = ledger::require_ingredient(&txn, ingredient_id).await?;
    let (yield_pct, output_unit_id) = measured_yield(
        &txn,
        &ingredient,
        input_quantity,
        input_unit_id,
        output_quantity,
        output_unit_id,
    )
    .await?;
    let cost = derive_cost(ingredient.base_cost_per_unit, yield_pct)?;

    let now = chrono::Utc::now().naive_utc();
    let created = variation::ActiveModel {
        ingredient_id: Set(ingredient_id),
        name: Set(name.trim().to_string()),
        yield_percentage: Set(yield_pct),
        unit_id: Set(output_unit_id),
        calculated_cost: Set(cost),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = created.insert(&txn).await?;

    if !ingredient.has_variations {
        let mut active: ingredient::ActiveModel = ingredient.into();
        active.has_variations = Set(true);
        active.update(&txn).await?;
    }

    cascade::propagate(&txn, CostNode::Variation(created.id)).await?;
    txn.commit().await?;

    Ok(created)
}

/// Re-measures an existing variation's yield and recomputes its cost,
/// cascading to everything that references it.
pub async fn update_variation(
    db: &DatabaseConnection,
    variation_id: i64,
    name: String,
    input_quantity: Decimal,
    input_unit_id: i64,
    output_quantity: Decimal,
    output_unit_id: i64,
) -> Result<variation::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Variation name cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let variation = require_variation(&txn, variation_id).await?;
    let ingredient = ledger::require_ingredient(&txn, variation.ingredient_id).await?;
    let (yield_pct, output_unit_id) = measured_yield(
        &txn,
        &ingredient,
        input_quantity,
        input_unit_id,
        output_quantity,
        output_unit_id,
    )
    .await?;
    let cost = derive_cost(ingredient.base_cost_per_unit, yield_pct)?;

    let mut active: variation::ActiveModel = variation.into();
    active.name = Set(name.trim().to_string());
    active.yield_percentage = Set(yield_pct);
    active.unit_id = Set(output_unit_id);
    active.calculated_cost = Set(cost);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&txn).await?;

    cascade::propagate(&txn, CostNode::Variation(variation_id)).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Deletes a variation.
///
/// A variation still referenced by a recipe item or product composition is
/// protected; remove those lines first. Deleting the last variation clears
/// the ingredient's `has_variations` flag.
pub async fn delete_variation(db: &DatabaseConnection, variation_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let variation = require_variation(&txn, variation_id).await?;

    let referencing_items = RecipeItem::find()
        .filter(recipe_item::Column::ItemKind.eq(ItemKind::Variation))
        .filter(recipe_item::Column::ItemId.eq(variation_id))
        .count(&txn)
        .await?;
    let referencing_compositions = ProductComposition::find()
        .filter(product_composition::Column::ItemKind.eq(ItemKind::Variation))
        .filter(product_composition::Column::ItemId.eq(variation_id))
        .count(&txn)
        .await?;
    if referencing_items + referencing_compositions > 0 {
        return Err(Error::Validation {
            message: format!(
                "Variation '{}' is still used by {} line(s) and cannot be deleted",
                variation.name,
                referencing_items + referencing_compositions
            ),
        });
    }

    let ingredient_id = variation.ingredient_id;
    variation.delete(&txn).await?;

    let remaining = Variation::find()
        .filter(variation::Column::IngredientId.eq(ingredient_id))
        .count(&txn)
        .await?;
    if remaining == 0 {
        let ingredient = ledger::require_ingredient(&txn, ingredient_id).await?;
        let mut active: ingredient::ActiveModel = ingredient.into();
        active.has_variations = Set(false);
        active.update(&txn).await?;
    }

    txn.commit().await?;
    Ok(())
}

/// Re-derives the cached cost of every variation of an ingredient from its
/// current base cost. Used by the cascade when the ingredient's price moves.
/// Returns the ids of the refreshed variations.
pub(crate) async fn refresh_variations_for<C: ConnectionTrait>(
    db: &C,
    ingredient: &ingredient::Model,
) -> Result<Vec<i64>> {
    let variations = Variation::find()
        .filter(variation::Column::IngredientId.eq(ingredient.id))
        .all(db)
        .await?;

    let mut refreshed = Vec::with_capacity(variations.len());
    for variation in variations {
        let id = variation.id;
        let cost = derive_cost(ingredient.base_cost_per_unit, variation.yield_percentage)?;
        if cost != variation.calculated_cost {
            let mut active: variation::ActiveModel = variation.into();
            active.calculated_cost = Set(cost);
            active.updated_at = Set(chrono::Utc::now().naive_utc());
            active.update(db).await?;
        }
        refreshed.push(id);
    }
    Ok(refreshed)
}

/// Validates and converts a measured input/output pair into a yield
/// percentage, returning it with the output unit id.
async fn measured_yield<C: ConnectionTrait>(
    db: &C,
    ingredient: &ingredient::Model,
    input_quantity: Decimal,
    input_unit_id: i64,
    output_quantity: Decimal,
    output_unit_id: i64,
) -> Result<(Decimal, i64)> {
    let input_unit = units::get_unit(db, input_unit_id).await?;
    units::ensure_class(&input_unit, ingredient.measurement_class)?;
    let output_unit = units::get_unit(db, output_unit_id).await?;

    let input_base = units::to_base_with(&input_unit, input_quantity);
    let output_base = units::to_base_with(&output_unit, output_quantity);
    if output_base <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Output quantity must be positive (got {output_quantity})"),
        });
    }

    let yield_pct = yield_percentage(input_base, output_base)?;
    Ok((yield_pct, output_unit.id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_yield_and_cost_derivation() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;

        // 1 kg in, 800 g out -> 80% yield, cost scales by 1/0.8
        let deboned = create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::from(800),
            units.gram.id,
        )
        .await?;

        assert_eq!(deboned.yield_percentage, Decimal::from(80));
        assert_eq!(deboned.calculated_cost, dec("0.0125"));
        // identity: calculated_cost x (yield/100) == base_cost_per_unit
        assert_eq!(
            deboned.calculated_cost * deboned.yield_percentage / Decimal::ONE_HUNDRED,
            chicken.base_cost_per_unit
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_yield_above_one_hundred_percent_is_legal() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let rice = ingredient_with_manual_price(&db, "Rice", &units, "8.00").await?;

        // hydration gain: 1 kg dry -> 2.5 kg cooked
        let cooked = create_variation(
            &db,
            rice.id,
            "Cooked".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            dec("2.5"),
            units.kilogram.id,
        )
        .await?;

        assert_eq!(cooked.yield_percentage, Decimal::from(250));
        assert_eq!(cooked.calculated_cost, dec("0.0032"));

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_yield_input() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;

        let result = create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ZERO,
            units.kilogram.id,
            Decimal::from(800),
            units.gram.id,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidYieldInput { .. }
        ));

        let result = create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::ZERO,
            units.gram.id,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_input_unit_class_must_match_ingredient() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;

        let result = create_variation(
            &db,
            chicken.id,
            "Juiced".to_string(),
            Decimal::ONE,
            units.liter.id, // volume input for a weight ingredient
            Decimal::from(500),
            units.milliliter.id,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::IncompatibleMeasurementClass { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_has_variations_flag_lifecycle() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;
        assert!(!chicken.has_variations);

        let deboned = create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::from(800),
            units.gram.id,
        )
        .await?;
        let chicken = ledger::get_ingredient(&db, chicken.id).await?.unwrap();
        assert!(chicken.has_variations);

        delete_variation(&db, deboned.id).await?;
        let chicken = ledger::get_ingredient(&db, chicken.id).await?.unwrap();
        assert!(!chicken.has_variations);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_variation_recomputes_cost() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;

        let deboned = create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::from(800),
            units.gram.id,
        )
        .await?;

        let deboned = update_variation(
            &db,
            deboned.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::from(500),
            units.gram.id,
        )
        .await?;
        assert_eq!(deboned.yield_percentage, Decimal::from(50));
        assert_eq!(deboned.calculated_cost, dec("0.02"));

        Ok(())
    }
}
