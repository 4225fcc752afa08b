//! Composite cost aggregation - Shared by recipes and products.
//!
//! A line item's cost is its quantity converted to the base unit of its
//! measurement class, multiplied by the referenced item's current unit cost.
//! The aggregate recompute functions here are the only writers of the cached
//! `calculated_cost` / `total_cost` / `cost_per_portion` / `base_cost`
//! fields: they always rebuild from already-updated upstream values, never
//! from deltas.

use crate::{
    core::{ledger, settings, units, variation},
    entities::{
        ProductComposition, RecipeItem,
        enums::{ItemKind, MeasurementClass},
        product, product_composition, recipe, recipe_item,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Current cost of one base unit (or one count, for products) of the
/// referenced item, selected by kind.
pub(crate) async fn unit_cost_of<C: ConnectionTrait>(
    db: &C,
    kind: ItemKind,
    item_id: i64,
) -> Result<Decimal> {
    match kind {
        ItemKind::Ingredient => Ok(ledger::require_ingredient(db, item_id)
            .await?
            .base_cost_per_unit),
        ItemKind::Variation => Ok(variation::require_variation(db, item_id)
            .await?
            .calculated_cost),
        ItemKind::Recipe => {
            // portion cost normalized to the recipe's own base unit
            let referenced = crate::core::recipe::require_recipe(db, item_id).await?;
            let yield_unit = units::get_unit(db, referenced.yield_unit_id).await?;
            referenced
                .cost_per_portion
                .checked_div(yield_unit.conversion_factor)
                .ok_or(Error::UnitNotFound {
                    unit_id: referenced.yield_unit_id,
                })
        }
        ItemKind::Product => Ok(crate::core::product::require_product(db, item_id)
            .await?
            .base_cost),
    }
}

/// Measurement class a line's unit must belong to, or `None` for product
/// references (bare counts).
pub(crate) async fn referenced_class<C: ConnectionTrait>(
    db: &C,
    kind: ItemKind,
    item_id: i64,
) -> Result<Option<MeasurementClass>> {
    match kind {
        ItemKind::Ingredient => Ok(Some(
            ledger::require_ingredient(db, item_id)
                .await?
                .measurement_class,
        )),
        ItemKind::Variation => {
            let referenced = variation::require_variation(db, item_id).await?;
            let unit = units::get_unit(db, referenced.unit_id).await?;
            Ok(Some(unit.measurement_class))
        }
        ItemKind::Recipe => {
            let referenced = crate::core::recipe::require_recipe(db, item_id).await?;
            let unit = units::get_unit(db, referenced.yield_unit_id).await?;
            Ok(Some(unit.measurement_class))
        }
        ItemKind::Product => Ok(None),
    }
}

/// Cost of one line: quantity in base units x referenced unit cost.
/// Product-kind lines use their quantity as a bare count.
pub(crate) async fn line_cost<C: ConnectionTrait>(
    db: &C,
    kind: ItemKind,
    item_id: i64,
    quantity: Decimal,
    unit_id: Option<i64>,
) -> Result<Decimal> {
    let unit_cost = unit_cost_of(db, kind, item_id).await?;
    if kind == ItemKind::Product {
        return Ok(unit_cost * quantity);
    }

    let unit_id = unit_id.ok_or(Error::Validation {
        message: "Line items referencing an ingredient, variation, or recipe require a unit"
            .to_string(),
    })?;
    let unit = units::get_unit(db, unit_id).await?;
    Ok(unit_cost * units::to_base_with(&unit, quantity))
}

/// Rebuilds a recipe's line costs and aggregates from current upstream state.
///
/// `total_cost` is the sum of the line costs; `labor_cost` charges the prep
/// time against the workspace labor rate (0 when unset); `cost_per_portion`
/// spreads both over the yield quantity.
pub(crate) async fn recompute_recipe<C: ConnectionTrait>(
    db: &C,
    recipe_id: i64,
) -> Result<recipe::Model> {
    let recipe = crate::core::recipe::require_recipe(db, recipe_id).await?;

    let items = RecipeItem::find()
        .filter(recipe_item::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_item::Column::Position)
        .all(db)
        .await?;

    let mut total_cost = Decimal::ZERO;
    for item in items {
        let cost = line_cost(db, item.item_kind, item.item_id, item.quantity, Some(item.unit_id))
            .await?;
        total_cost += cost;
        if cost != item.calculated_cost {
            let mut active: recipe_item::ActiveModel = item.into();
            active.calculated_cost = Set(cost);
            active.update(db).await?;
        }
    }

    let rate = settings::labor_cost_per_hour(db)
        .await?
        .unwrap_or(Decimal::ZERO);
    let labor_cost = Decimal::from(recipe.prep_time_minutes) * rate / Decimal::from(60);

    if recipe.yield_quantity <= Decimal::ZERO {
        return Err(Error::InvalidYield {
            yield_quantity: recipe.yield_quantity,
        });
    }
    let cost_per_portion = (total_cost + labor_cost)
        .checked_div(recipe.yield_quantity)
        .ok_or(Error::InvalidYield {
            yield_quantity: recipe.yield_quantity,
        })?;

    let mut active: recipe::ActiveModel = recipe.into();
    active.total_cost = Set(total_cost);
    active.labor_cost = Set(labor_cost);
    active.cost_per_portion = Set(cost_per_portion);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await.map_err(Into::into)
}

/// Rebuilds a product's line costs and its `base_cost` from current upstream
/// state. Products carry no labor charge and no portioning.
pub(crate) async fn recompute_product<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
) -> Result<product::Model> {
    let product = crate::core::product::require_product(db, product_id).await?;

    let compositions = ProductComposition::find()
        .filter(product_composition::Column::ProductId.eq(product_id))
        .all(db)
        .await?;

    let mut base_cost = Decimal::ZERO;
    for line in compositions {
        let cost = line_cost(db, line.item_kind, line.item_id, line.quantity, line.unit_id).await?;
        base_cost += cost;
        if cost != line.calculated_cost {
            let mut active: product_composition::ActiveModel = line.into();
            active.calculated_cost = Set(cost);
            active.update(db).await?;
        }
    }

    let mut active: product::ActiveModel = product.into();
    active.base_cost = Set(base_cost);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await.map_err(Into::into)
}
