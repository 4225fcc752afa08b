//! Recipe business logic - CRUD for recipes, their line items, and steps.
//!
//! Every mutation that can move a cost validates first (existence, unit
//! class, self-reference, cycles), then writes, rebuilds the recipe's
//! aggregate through the composite aggregator, and cascades - all inside one
//! transaction. Preparation steps carry no cost semantics and never trigger
//! recomputation.

use crate::{
    core::{aggregate, cascade, cascade::CostNode, units},
    entities::{
        Recipe, RecipeItem, RecipeStep, enums::ItemKind, recipe, recipe_item, recipe_step,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fetches a recipe or fails with `NotFound`.
pub(crate) async fn require_recipe<C: ConnectionTrait>(
    db: &C,
    recipe_id: i64,
) -> Result<recipe::Model> {
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "recipe",
            id: recipe_id,
        })
}

/// Retrieves a specific recipe by its unique ID.
pub async fn get_recipe(db: &DatabaseConnection, recipe_id: i64) -> Result<Option<recipe::Model>> {
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a recipe's line items in list order.
pub async fn get_recipe_items(
    db: &DatabaseConnection,
    recipe_id: i64,
) -> Result<Vec<recipe_item::Model>> {
    RecipeItem::find()
        .filter(recipe_item::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_item::Column::Position)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a recipe's preparation steps in order.
pub async fn get_recipe_steps(
    db: &DatabaseConnection,
    recipe_id: i64,
) -> Result<Vec<recipe_step::Model>> {
    RecipeStep::find()
        .filter(recipe_step::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_step::Column::StepNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new recipe, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The yield quantity is not positive, or the prep time is negative
/// - The yield unit does not exist
pub async fn create_recipe(
    db: &DatabaseConnection,
    name: String,
    yield_quantity: Decimal,
    yield_unit_id: i64,
    prep_time_minutes: i32,
) -> Result<recipe::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Recipe name cannot be empty".to_string(),
        });
    }
    validate_attributes(yield_quantity, prep_time_minutes)?;

    let txn = db.begin().await?;

    units::get_unit(&txn, yield_unit_id).await?;

    let now = chrono::Utc::now().naive_utc();
    let created = recipe::ActiveModel {
        name: Set(name.trim().to_string()),
        yield_quantity: Set(yield_quantity),
        yield_unit_id: Set(yield_unit_id),
        prep_time_minutes: Set(prep_time_minutes),
        total_cost: Set(Decimal::ZERO),
        labor_cost: Set(Decimal::ZERO),
        cost_per_portion: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = created.insert(&txn).await?;

    // picks up the labor charge for the prep time; nothing references a
    // brand-new recipe, so no cascade
    let created = aggregate::recompute_recipe(&txn, created.id).await?;
    txn.commit().await?;

    Ok(created)
}

/// Updates a recipe's yield and prep time, then recomputes and cascades.
pub async fn set_recipe_attributes(
    db: &DatabaseConnection,
    recipe_id: i64,
    yield_quantity: Decimal,
    yield_unit_id: i64,
    prep_time_minutes: i32,
) -> Result<recipe::Model> {
    validate_attributes(yield_quantity, prep_time_minutes)?;

    let txn = db.begin().await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    units::get_unit(&txn, yield_unit_id).await?;

    let mut active: recipe::ActiveModel = recipe.into();
    active.yield_quantity = Set(yield_quantity);
    active.yield_unit_id = Set(yield_unit_id);
    active.prep_time_minutes = Set(prep_time_minutes);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&txn).await?;

    aggregate::recompute_recipe(&txn, recipe_id).await?;
    cascade::propagate(&txn, CostNode::Recipe(recipe_id)).await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    txn.commit().await?;

    Ok(recipe)
}

/// Inserts or updates one line of a recipe and recomputes everything
/// downstream.
///
/// Pass `line_id: None` to append a new line, `Some(id)` to edit an existing
/// one. Recipes may reference ingredients, variations, and other recipes -
/// never products.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive, or the kind is `Product`
/// - The referenced entity or the unit does not exist
/// - The unit's measurement class differs from the referenced item's
/// - The line would make the recipe contain itself, directly (`SelfReference`)
///   or through a longer chain (`CompositionCycle`)
pub async fn upsert_recipe_item(
    db: &DatabaseConnection,
    recipe_id: i64,
    line_id: Option<i64>,
    item_kind: ItemKind,
    item_id: i64,
    quantity: Decimal,
    unit_id: i64,
) -> Result<recipe::Model> {
    if quantity <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Item quantity must be positive (got {quantity})"),
        });
    }
    if item_kind == ItemKind::Product {
        return Err(Error::Validation {
            message: "Recipes cannot contain products".to_string(),
        });
    }

    let txn = db.begin().await?;

    require_recipe(&txn, recipe_id).await?;
    cascade::ensure_no_cycle(
        &txn,
        CostNode::Recipe(recipe_id),
        cascade::node_for(item_kind, item_id),
    )
    .await?;

    // referenced_class also proves the referenced entity exists
    let expected = aggregate::referenced_class(&txn, item_kind, item_id).await?;
    let unit = units::get_unit(&txn, unit_id).await?;
    if let Some(expected) = expected {
        units::ensure_class(&unit, expected)?;
    }

    let cost = aggregate::line_cost(&txn, item_kind, item_id, quantity, Some(unit_id)).await?;

    match line_id {
        Some(line_id) => {
            let line = RecipeItem::find_by_id(line_id)
                .one(&txn)
                .await?
                .filter(|line| line.recipe_id == recipe_id)
                .ok_or(Error::NotFound {
                    entity: "recipe item",
                    id: line_id,
                })?;
            let mut active: recipe_item::ActiveModel = line.into();
            active.item_kind = Set(item_kind);
            active.item_id = Set(item_id);
            active.quantity = Set(quantity);
            active.unit_id = Set(unit_id);
            active.calculated_cost = Set(cost);
            active.update(&txn).await?;
        }
        None => {
            let last = RecipeItem::find()
                .filter(recipe_item::Column::RecipeId.eq(recipe_id))
                .order_by_desc(recipe_item::Column::Position)
                .one(&txn)
                .await?;
            let position = last.map_or(1, |line| line.position + 1);
            let line = recipe_item::ActiveModel {
                recipe_id: Set(recipe_id),
                item_kind: Set(item_kind),
                item_id: Set(item_id),
                quantity: Set(quantity),
                unit_id: Set(unit_id),
                calculated_cost: Set(cost),
                position: Set(position),
                ..Default::default()
            };
            line.insert(&txn).await?;
        }
    }

    aggregate::recompute_recipe(&txn, recipe_id).await?;
    cascade::propagate(&txn, CostNode::Recipe(recipe_id)).await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    txn.commit().await?;

    Ok(recipe)
}

/// Deletes one line of a recipe and recomputes everything downstream.
pub async fn delete_recipe_item(db: &DatabaseConnection, line_id: i64) -> Result<recipe::Model> {
    let txn = db.begin().await?;

    let line = RecipeItem::find_by_id(line_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "recipe item",
            id: line_id,
        })?;
    let recipe_id = line.recipe_id;
    line.delete(&txn).await?;

    aggregate::recompute_recipe(&txn, recipe_id).await?;
    cascade::propagate(&txn, CostNode::Recipe(recipe_id)).await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    txn.commit().await?;

    Ok(recipe)
}

/// Replaces a recipe's preparation steps with the given ordered list.
/// Steps are free text with no cost semantics.
pub async fn set_recipe_steps(
    db: &DatabaseConnection,
    recipe_id: i64,
    steps: Vec<String>,
) -> Result<Vec<recipe_step::Model>> {
    let txn = db.begin().await?;

    require_recipe(&txn, recipe_id).await?;

    RecipeStep::delete_many()
        .filter(recipe_step::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;

    let mut written = Vec::with_capacity(steps.len());
    for (index, instruction) in steps.into_iter().enumerate() {
        let step = recipe_step::ActiveModel {
            recipe_id: Set(recipe_id),
            step_number: Set(i32::try_from(index + 1).unwrap_or(i32::MAX)),
            instruction: Set(instruction),
            ..Default::default()
        };
        written.push(step.insert(&txn).await?);
    }

    txn.commit().await?;
    Ok(written)
}

fn validate_attributes(yield_quantity: Decimal, prep_time_minutes: i32) -> Result<()> {
    if yield_quantity <= Decimal::ZERO {
        return Err(Error::InvalidYield { yield_quantity });
    }
    if prep_time_minutes < 0 {
        return Err(Error::Validation {
            message: format!("Prep time cannot be negative (got {prep_time_minutes})"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_recipe_aggregates_items_labor_and_portions() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        crate::core::settings::set_labor_cost_per_hour(&db, dec("30.00")).await?;

        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        let butter = ingredient_with_manual_price(&db, "Butter", &units, "40.00").await?;

        let brioche = create_recipe(
            &db,
            "Brioche".to_string(),
            Decimal::from(4),
            units.count.id,
            30,
        )
        .await?;
        // labor alone: 30 min x 30.00/h = 15.00
        assert_eq!(brioche.labor_cost, dec("15.00"));

        let brioche = upsert_recipe_item(
            &db,
            brioche.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::from(500),
            units.gram.id,
        )
        .await?;
        let brioche = upsert_recipe_item(
            &db,
            brioche.id,
            None,
            ItemKind::Ingredient,
            butter.id,
            Decimal::from(250),
            units.gram.id,
        )
        .await?;

        // 500 g x 0.005 + 250 g x 0.04 = 2.50 + 10.00
        assert_eq!(brioche.total_cost, dec("12.500"));
        let items = get_recipe_items(&db, brioche.id).await?;
        let sum: Decimal = items.iter().map(|line| line.calculated_cost).sum();
        assert_eq!(brioche.total_cost, sum);
        // (12.50 + 15.00) / 4 portions
        assert_eq!(brioche.cost_per_portion, dec("6.875"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_recipe_rejects_bad_yield() -> Result<()> {
        let (db, units) = setup_with_units().await?;

        let result = create_recipe(
            &db,
            "Broken".to_string(),
            Decimal::ZERO,
            units.count.id,
            0,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidYield { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_item_unit_class_must_match_referenced_item() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        let dough = create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;

        let result = upsert_recipe_item(
            &db,
            dough.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::ONE,
            units.liter.id, // volume unit for a weight ingredient
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::IncompatibleMeasurementClass { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_self_reference_rejected() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let dough = create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;

        let result = upsert_recipe_item(
            &db,
            dough.id,
            None,
            ItemKind::Recipe,
            dough.id,
            Decimal::ONE,
            units.count.id,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::SelfReference { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_two_step_cycle_rejected_at_insertion() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let a = create_recipe(&db, "A".to_string(), Decimal::ONE, units.count.id, 0).await?;
        let b = create_recipe(&db, "B".to_string(), Decimal::ONE, units.count.id, 0).await?;

        upsert_recipe_item(
            &db,
            a.id,
            None,
            ItemKind::Recipe,
            b.id,
            Decimal::ONE,
            units.count.id,
        )
        .await?;

        // B containing A would close A -> B -> A
        let result = upsert_recipe_item(
            &db,
            b.id,
            None,
            ItemKind::Recipe,
            a.id,
            Decimal::ONE,
            units.count.id,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::CompositionCycle { entity: "recipe", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_item_recomputes() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        let dough = create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;
        let dough = add_recipe_ingredient(&db, &dough, &flour, 1000, &units).await?;
        assert_eq!(dough.total_cost, dec("5.000"));

        let items = get_recipe_items(&db, dough.id).await?;
        let dough = delete_recipe_item(&db, items[0].id).await?;
        assert_eq!(dough.total_cost, Decimal::ZERO);
        assert_eq!(dough.cost_per_portion, Decimal::ZERO);

        Ok(())
    }

    #[tokio::test]
    async fn test_steps_replace_in_order() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let dough = create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;

        set_recipe_steps(
            &db,
            dough.id,
            vec!["Mix".to_string(), "Knead".to_string()],
        )
        .await?;
        let steps = set_recipe_steps(
            &db,
            dough.id,
            vec![
                "Mix".to_string(),
                "Rest".to_string(),
                "Knead".to_string(),
            ],
        )
        .await?;

        assert_eq!(steps.len(), 3);
        let stored = get_recipe_steps(&db, dough.id).await?;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].step_number, 2);
        assert_eq!(stored[1].instruction, "Rest");

        Ok(())
    }
}
