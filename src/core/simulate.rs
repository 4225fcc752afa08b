//! What-if simulation - Replays the cascade math against a hypothetical
//! ingredient price without persisting anything.
//!
//! The simulator works in ratios and deltas where the real cascade rebuilds
//! absolute values: variations and direct references scale by the
//! ingredient's cost ratio, and product lines that reference an affected
//! recipe scale by that recipe's own ratio. Ratios deliberately do not
//! compose across more than one recipe hop - that matches the behavior this
//! engine replays, and the divergence only appears for products nested
//! behind two or more recipe levels.
//!
//! Everything here is read-only: no cached cost field and no index is ever
//! written.

use crate::{
    core::{ledger, menu, units},
    entities::{
        MenuItem, ProductComposition, RecipeItem, Variation,
        enums::{ItemKind, MenuEntryKind},
        menu_fee, menu_item, product_composition, recipe_item, variation,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Projected effect on one variation.
#[derive(Debug, Clone, Serialize)]
pub struct VariationImpact {
    pub variation_id: i64,
    pub name: String,
    pub current_cost: Decimal,
    pub projected_cost: Decimal,
    pub change_percentage: Decimal,
}

/// Projected effect on one recipe that contains the ingredient or one of its
/// variations directly.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeImpact {
    pub recipe_id: i64,
    pub name: String,
    pub current_total_cost: Decimal,
    pub projected_total_cost: Decimal,
    pub current_cost_per_portion: Decimal,
    pub projected_cost_per_portion: Decimal,
    pub change_percentage: Decimal,
}

/// Projected effect on one product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImpact {
    pub product_id: i64,
    pub name: String,
    pub current_base_cost: Decimal,
    pub projected_base_cost: Decimal,
    pub change_percentage: Decimal,
}

/// Projected effect on one menu listing, with a re-price suggestion that
/// preserves its current margin percentage.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemImpact {
    pub menu_item_id: i64,
    pub menu_id: i64,
    pub sale_price: Decimal,
    pub current_total_cost: Decimal,
    pub projected_total_cost: Decimal,
    pub current_margin_percentage: Decimal,
    pub projected_margin_value: Decimal,
    pub projected_margin_percentage: Decimal,
    pub suggested_price: Decimal,
}

/// Structured result of a what-if simulation.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub current_base_cost: Decimal,
    pub projected_base_cost: Decimal,
    pub cost_ratio: Decimal,
    pub variations: Vec<VariationImpact>,
    pub recipes: Vec<RecipeImpact>,
    pub products: Vec<ProductImpact>,
    pub menu_items: Vec<MenuItemImpact>,
    pub affected_variations: usize,
    pub affected_recipes: usize,
    pub affected_products: usize,
    /// Mean percentage cost change across variations, recipes, and products
    pub average_change_percentage: Decimal,
    /// How many listings would start losing money at the projected cost
    pub menu_items_losing_money: usize,
}

/// Simulates "what if this ingredient's price changed?" against current
/// state, committing nothing.
pub async fn simulate(
    db: &DatabaseConnection,
    ingredient_id: i64,
    hypothetical_price_per_price_unit: Decimal,
) -> Result<ImpactReport> {
    if hypothetical_price_per_price_unit < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!(
                "Hypothetical price cannot be negative (got {hypothetical_price_per_price_unit})"
            ),
        });
    }

    let ingredient = ledger::require_ingredient(db, ingredient_id).await?;
    let price_unit = units::get_unit(db, ingredient.price_unit_id).await?;
    let projected_base = hypothetical_price_per_price_unit
        .checked_div(price_unit.conversion_factor)
        .ok_or(Error::UnitNotFound {
            unit_id: price_unit.id,
        })?;

    let current_base = ingredient.base_cost_per_unit;
    let ratio = if current_base == Decimal::ZERO {
        Decimal::ONE
    } else {
        projected_base / current_base
    };

    // Variations scale multiplicatively with the ingredient.
    let variations = Variation::find()
        .filter(variation::Column::IngredientId.eq(ingredient_id))
        .all(db)
        .await?;
    let variation_ids: Vec<i64> = variations.iter().map(|v| v.id).collect();
    let variation_impacts: Vec<VariationImpact> = variations
        .into_iter()
        .map(|v| {
            let projected = v.calculated_cost * ratio;
            VariationImpact {
                variation_id: v.id,
                name: v.name,
                current_cost: v.calculated_cost,
                projected_cost: projected,
                change_percentage: percentage_change(v.calculated_cost, projected),
            }
        })
        .collect();

    // Recipes containing the ingredient or one of its variations directly:
    // the recipe delta is the sum of its affected lines' deltas.
    let mut recipe_deltas: BTreeMap<i64, Decimal> = BTreeMap::new();
    for item in affected_recipe_items(db, ingredient_id, &variation_ids).await? {
        *recipe_deltas.entry(item.recipe_id).or_default() +=
            item.calculated_cost * (ratio - Decimal::ONE);
    }

    let mut recipe_impacts = Vec::with_capacity(recipe_deltas.len());
    let mut recipe_ratios: HashMap<i64, Decimal> = HashMap::new();
    for (&recipe_id, &delta) in &recipe_deltas {
        let recipe = crate::core::recipe::require_recipe(db, recipe_id).await?;
        let projected_total = recipe.total_cost + delta;
        let recipe_ratio = if recipe.total_cost == Decimal::ZERO {
            Decimal::ONE
        } else {
            projected_total / recipe.total_cost
        };
        recipe_ratios.insert(recipe_id, recipe_ratio);

        let projected_per_portion = (projected_total + recipe.labor_cost)
            .checked_div(recipe.yield_quantity)
            .ok_or(Error::InvalidYield {
                yield_quantity: recipe.yield_quantity,
            })?;
        recipe_impacts.push(RecipeImpact {
            recipe_id,
            name: recipe.name,
            current_total_cost: recipe.total_cost,
            projected_total_cost: projected_total,
            current_cost_per_portion: recipe.cost_per_portion,
            projected_cost_per_portion: projected_per_portion,
            change_percentage: percentage_change(recipe.total_cost, projected_total),
        });
    }

    // Products: lines on the ingredient/variations scale by the ingredient
    // ratio; lines on an affected recipe scale by that recipe's own ratio.
    let mut product_deltas: BTreeMap<i64, Decimal> = BTreeMap::new();
    for line in affected_product_lines(db, ingredient_id, &variation_ids).await? {
        *product_deltas.entry(line.product_id).or_default() +=
            line.calculated_cost * (ratio - Decimal::ONE);
    }
    let recipe_ids: Vec<i64> = recipe_deltas.keys().copied().collect();
    if !recipe_ids.is_empty() {
        let recipe_lines = ProductComposition::find()
            .filter(product_composition::Column::ItemKind.eq(ItemKind::Recipe))
            .filter(product_composition::Column::ItemId.is_in(recipe_ids.clone()))
            .all(db)
            .await?;
        for line in recipe_lines {
            let recipe_ratio = recipe_ratios
                .get(&line.item_id)
                .copied()
                .unwrap_or(Decimal::ONE);
            *product_deltas.entry(line.product_id).or_default() +=
                line.calculated_cost * (recipe_ratio - Decimal::ONE);
        }
    }

    let mut product_impacts = Vec::with_capacity(product_deltas.len());
    let mut product_ratios: HashMap<i64, Decimal> = HashMap::new();
    for (&product_id, &delta) in &product_deltas {
        let product = crate::core::product::require_product(db, product_id).await?;
        let projected = product.base_cost + delta;
        let product_ratio = if product.base_cost == Decimal::ZERO {
            Decimal::ONE
        } else {
            projected / product.base_cost
        };
        product_ratios.insert(product_id, product_ratio);
        product_impacts.push(ProductImpact {
            product_id,
            name: product.name,
            current_base_cost: product.base_cost,
            projected_base_cost: projected,
            change_percentage: percentage_change(product.base_cost, projected),
        });
    }

    // Menu listings found directly on the ingredient, an affected recipe, or
    // an affected product.
    let menu_item_impacts = project_menu_items(
        db,
        ingredient_id,
        ratio,
        &recipe_ratios,
        &product_ratios,
    )
    .await?;
    let menu_items_losing_money = menu_item_impacts
        .iter()
        .filter(|impact| impact.projected_margin_value < Decimal::ZERO)
        .count();

    let average_change_percentage = {
        let changes: Vec<Decimal> = variation_impacts
            .iter()
            .map(|impact| impact.change_percentage)
            .chain(recipe_impacts.iter().map(|impact| impact.change_percentage))
            .chain(
                product_impacts
                    .iter()
                    .map(|impact| impact.change_percentage),
            )
            .collect();
        if changes.is_empty() {
            Decimal::ZERO
        } else {
            changes.iter().copied().sum::<Decimal>()
                .checked_div(Decimal::from(changes.len() as u64))
                .unwrap_or(Decimal::ZERO)
        }
    };

    Ok(ImpactReport {
        ingredient_id,
        ingredient_name: ingredient.name,
        current_base_cost: current_base,
        projected_base_cost: projected_base,
        cost_ratio: ratio,
        affected_variations: variation_impacts.len(),
        affected_recipes: recipe_impacts.len(),
        affected_products: product_impacts.len(),
        variations: variation_impacts,
        recipes: recipe_impacts,
        products: product_impacts,
        menu_items: menu_item_impacts,
        average_change_percentage,
        menu_items_losing_money,
    })
}

/// Recipe lines that reference the ingredient or one of its variations.
async fn affected_recipe_items(
    db: &DatabaseConnection,
    ingredient_id: i64,
    variation_ids: &[i64],
) -> Result<Vec<recipe_item::Model>> {
    let mut lines = RecipeItem::find()
        .filter(recipe_item::Column::ItemKind.eq(ItemKind::Ingredient))
        .filter(recipe_item::Column::ItemId.eq(ingredient_id))
        .all(db)
        .await?;
    if !variation_ids.is_empty() {
        let variation_lines = RecipeItem::find()
            .filter(recipe_item::Column::ItemKind.eq(ItemKind::Variation))
            .filter(recipe_item::Column::ItemId.is_in(variation_ids.to_vec()))
            .all(db)
            .await?;
        lines.extend(variation_lines);
    }
    Ok(lines)
}

/// Product lines that reference the ingredient or one of its variations.
async fn affected_product_lines(
    db: &DatabaseConnection,
    ingredient_id: i64,
    variation_ids: &[i64],
) -> Result<Vec<product_composition::Model>> {
    let mut lines = ProductComposition::find()
        .filter(product_composition::Column::ItemKind.eq(ItemKind::Ingredient))
        .filter(product_composition::Column::ItemId.eq(ingredient_id))
        .all(db)
        .await?;
    if !variation_ids.is_empty() {
        let variation_lines = ProductComposition::find()
            .filter(product_composition::Column::ItemKind.eq(ItemKind::Variation))
            .filter(product_composition::Column::ItemId.is_in(variation_ids.to_vec()))
            .all(db)
            .await?;
        lines.extend(variation_lines);
    }
    Ok(lines)
}

/// Projects every menu listing that points at the ingredient, an affected
/// recipe, or an affected product, and suggests a price that preserves the
/// listing's current margin percentage.
async fn project_menu_items(
    db: &DatabaseConnection,
    ingredient_id: i64,
    ingredient_ratio: Decimal,
    recipe_ratios: &HashMap<i64, Decimal>,
    product_ratios: &HashMap<i64, Decimal>,
) -> Result<Vec<MenuItemImpact>> {
    let mut listings: Vec<(menu_item::Model, Decimal)> = Vec::new();

    let direct = MenuItem::find()
        .filter(menu_item::Column::ItemKind.eq(MenuEntryKind::Ingredient))
        .filter(menu_item::Column::ItemId.eq(ingredient_id))
        .all(db)
        .await?;
    listings.extend(direct.into_iter().map(|item| (item, ingredient_ratio)));

    let recipe_ids: Vec<i64> = recipe_ratios.keys().copied().collect();
    if !recipe_ids.is_empty() {
        let on_recipes = MenuItem::find()
            .filter(menu_item::Column::ItemKind.eq(MenuEntryKind::Recipe))
            .filter(menu_item::Column::ItemId.is_in(recipe_ids))
            .all(db)
            .await?;
        for item in on_recipes {
            let ratio = recipe_ratios
                .get(&item.item_id)
                .copied()
                .unwrap_or(Decimal::ONE);
            listings.push((item, ratio));
        }
    }

    let product_ids: Vec<i64> = product_ratios.keys().copied().collect();
    if !product_ids.is_empty() {
        let on_products = MenuItem::find()
            .filter(menu_item::Column::ItemKind.eq(MenuEntryKind::Product))
            .filter(menu_item::Column::ItemId.is_in(product_ids))
            .all(db)
            .await?;
        for item in on_products {
            let ratio = product_ratios
                .get(&item.item_id)
                .copied()
                .unwrap_or(Decimal::ONE);
            listings.push((item, ratio));
        }
    }

    if listings.is_empty() {
        return Ok(Vec::new());
    }

    let total_fixed = menu::total_active_fixed_costs(db).await?;
    let mut menus: HashMap<i64, (crate::entities::menu::Model, Vec<menu_fee::Model>)> =
        HashMap::new();

    let mut impacts = Vec::with_capacity(listings.len());
    for (item, item_ratio) in listings {
        if !menus.contains_key(&item.menu_id) {
            let owning = menu::require_menu(db, item.menu_id).await?;
            let fees = crate::entities::MenuFee::find()
                .filter(menu_fee::Column::MenuId.eq(item.menu_id))
                .all(db)
                .await?;
            menus.insert(item.menu_id, (owning, fees));
        }
        let Some((owning, fees)) = menus.get(&item.menu_id) else {
            continue;
        };

        let current_basis = menu::menu_cost_basis(db, item.item_kind, item.item_id).await?;
        let projected_basis = current_basis * item_ratio;
        let pricing = menu::price_components(
            projected_basis,
            item.sale_price,
            fees,
            owning.apportionment_policy,
            owning.policy_value,
            total_fixed,
        );

        // preserve the listing's current margin; outside [0, 100) fall back
        // to a 30% markup over the projected cost
        let current_margin = item.margin_percentage;
        let suggested_price = if current_margin >= Decimal::ZERO {
            menu::price_for_target_margin(pricing.total_cost, current_margin)
                .unwrap_or(pricing.total_cost * Decimal::new(13, 1))
        } else {
            pricing.total_cost * Decimal::new(13, 1)
        };

        impacts.push(MenuItemImpact {
            menu_item_id: item.id,
            menu_id: item.menu_id,
            sale_price: item.sale_price,
            current_total_cost: item.total_cost,
            projected_total_cost: pricing.total_cost,
            current_margin_percentage: current_margin,
            projected_margin_value: pricing.margin_value,
            projected_margin_percentage: pricing.margin_percentage,
            suggested_price,
        });
    }

    Ok(impacts)
}

/// Percentage change from `old` to `new`, 0 when there was no prior value.
fn percentage_change(old: Decimal, new: Decimal) -> Decimal {
    if old == Decimal::ZERO {
        Decimal::ZERO
    } else {
        (new - old) / old * Decimal::ONE_HUNDRED
    }
}
