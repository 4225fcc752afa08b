//! Dependency graph and cascade scheduler.
//!
//! When a source cost changes, every line item that references it directly is
//! recomputed, the owning recipes/products rebuild their aggregates, and the
//! walk continues upward until no new owners appear. Owners are recomputed
//! children-first; the composition graph is kept acyclic at edge-insertion
//! time (`ensure_no_cycle`), so the walk always terminates and converges in a
//! single pass. Menu listings that point at any touched node are repriced at
//! the end.
//!
//! The whole propagation runs inside the transaction of the mutation that
//! triggered it: a concurrent reader never observes a recipe with stale line
//! costs but a fresh aggregate.

use crate::{
    core::{aggregate, ledger, menu, variation},
    entities::{
        ProductComposition, RecipeItem,
        enums::{ItemKind, MenuEntryKind},
        product_composition, recipe_item,
    },
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A node in the cost dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostNode {
    Ingredient(i64),
    Variation(i64),
    Recipe(i64),
    Product(i64),
}

impl CostNode {
    /// Id of the underlying entity.
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Ingredient(id) | Self::Variation(id) | Self::Recipe(id) | Self::Product(id) => id,
        }
    }

    /// How recipe items and product compositions reference this node.
    pub(crate) fn item_kind(self) -> ItemKind {
        match self {
            Self::Ingredient(_) => ItemKind::Ingredient,
            Self::Variation(_) => ItemKind::Variation,
            Self::Recipe(_) => ItemKind::Recipe,
            Self::Product(_) => ItemKind::Product,
        }
    }

    /// How menu items reference this node; variations are never listed.
    pub(crate) fn menu_entry_kind(self) -> Option<MenuEntryKind> {
        match self {
            Self::Ingredient(_) => Some(MenuEntryKind::Ingredient),
            Self::Recipe(_) => Some(MenuEntryKind::Recipe),
            Self::Product(_) => Some(MenuEntryKind::Product),
            Self::Variation(_) => None,
        }
    }
}

/// Builds a `CostNode` from a line item's kind/id pair.
pub(crate) fn node_for(kind: ItemKind, item_id: i64) -> CostNode {
    match kind {
        ItemKind::Ingredient => CostNode::Ingredient(item_id),
        ItemKind::Variation => CostNode::Variation(item_id),
        ItemKind::Recipe => CostNode::Recipe(item_id),
        ItemKind::Product => CostNode::Product(item_id),
    }
}

/// Propagates a cost change from `source` through everything that references
/// it, directly or transitively.
pub(crate) async fn propagate<C: ConnectionTrait>(db: &C, source: CostNode) -> Result<()> {
    // A variation's cost derives straight from its ingredient, so an
    // ingredient change fans out through its variations as extra roots.
    let mut roots = vec![source];
    if let CostNode::Ingredient(id) = source {
        let ingredient = ledger::require_ingredient(db, id).await?;
        for variation_id in variation::refresh_variations_for(db, &ingredient).await? {
            roots.push(CostNode::Variation(variation_id));
        }
    }

    // Upward closure over the reverse index, with a per-run visited set.
    let mut visited: HashSet<CostNode> = roots.iter().copied().collect();
    let mut frontier: VecDeque<CostNode> = roots.iter().copied().collect();
    let mut owners: Vec<CostNode> = Vec::new();
    let mut edges: HashSet<(CostNode, CostNode)> = HashSet::new();
    while let Some(node) = frontier.pop_front() {
        for owner in direct_dependents(db, node).await? {
            edges.insert((node, owner));
            if visited.insert(owner) {
                owners.push(owner);
                frontier.push_back(owner);
            }
        }
    }

    // Recompute children before owners, so every aggregate is rebuilt from
    // already-updated upstream values exactly once.
    let ordered = dependency_order(&owners, &edges);
    for owner in &ordered {
        match owner {
            CostNode::Recipe(id) => {
                aggregate::recompute_recipe(db, *id).await?;
            }
            CostNode::Product(id) => {
                aggregate::recompute_product(db, *id).await?;
            }
            // only recipes and products own line items
            CostNode::Ingredient(_) | CostNode::Variation(_) => {}
        }
    }

    debug!(?source, owners = ordered.len(), "cascade converged");

    // Menu listings hang directly off ingredients, recipes, and products.
    for node in roots.iter().chain(ordered.iter()) {
        menu::reprice_items_for(db, *node).await?;
    }

    Ok(())
}

/// Owners whose line items reference `node` directly.
async fn direct_dependents<C: ConnectionTrait>(db: &C, node: CostNode) -> Result<Vec<CostNode>> {
    let mut dependents = Vec::new();
    let mut seen: HashSet<CostNode> = HashSet::new();

    let items = RecipeItem::find()
        .filter(recipe_item::Column::ItemKind.eq(node.item_kind()))
        .filter(recipe_item::Column::ItemId.eq(node.id()))
        .all(db)
        .await?;
    for item in items {
        let owner = CostNode::Recipe(item.recipe_id);
        if seen.insert(owner) {
            dependents.push(owner);
        }
    }

    let lines = ProductComposition::find()
        .filter(product_composition::Column::ItemKind.eq(node.item_kind()))
        .filter(product_composition::Column::ItemId.eq(node.id()))
        .all(db)
        .await?;
    for line in lines {
        let owner = CostNode::Product(line.product_id);
        if seen.insert(owner) {
            dependents.push(owner);
        }
    }

    Ok(dependents)
}

/// Orders the collected owners children-first (Kahn's algorithm over the
/// affected subgraph). Edges from the roots carry no ordering constraint:
/// roots are already fresh when the walk starts.
fn dependency_order(owners: &[CostNode], edges: &HashSet<(CostNode, CostNode)>) -> Vec<CostNode> {
    let owner_set: HashSet<CostNode> = owners.iter().copied().collect();
    let mut indegree: HashMap<CostNode, usize> = owners.iter().map(|o| (*o, 0)).collect();
    let mut downstream: HashMap<CostNode, Vec<CostNode>> = HashMap::new();
    for (child, owner) in edges {
        if owner_set.contains(child) {
            downstream.entry(*child).or_default().push(*owner);
            if let Some(depth) = indegree.get_mut(owner) {
                *depth += 1;
            }
        }
    }

    let mut ready: VecDeque<CostNode> = owners
        .iter()
        .copied()
        .filter(|owner| indegree.get(owner) == Some(&0))
        .collect();
    let mut ordered = Vec::with_capacity(owners.len());
    while let Some(node) = ready.pop_front() {
        ordered.push(node);
        if let Some(nexts) = downstream.get(&node) {
            for next in nexts {
                if let Some(depth) = indegree.get_mut(next) {
                    *depth -= 1;
                    if *depth == 0 {
                        ready.push_back(*next);
                    }
                }
            }
        }
    }

    // The composition graph is acyclic by construction; if that invariant is
    // ever violated, keep the walk total in discovery order.
    if ordered.len() < owners.len() {
        let placed: HashSet<CostNode> = ordered.iter().copied().collect();
        for owner in owners {
            if !placed.contains(owner) {
                ordered.push(*owner);
            }
        }
    }
    ordered
}

/// Rejects an edge `owner -> child` whose insertion would close a cycle:
/// either a direct self-reference, or the owner already being reachable from
/// the child by walking the composition graph downward.
pub(crate) async fn ensure_no_cycle<C: ConnectionTrait>(
    db: &C,
    owner: CostNode,
    child: CostNode,
) -> Result<()> {
    let (entity, id) = match owner {
        CostNode::Recipe(id) => ("recipe", id),
        CostNode::Product(id) => ("product", id),
        // ingredients and variations own nothing, so they cannot close a cycle
        CostNode::Ingredient(_) | CostNode::Variation(_) => return Ok(()),
    };

    if owner == child {
        return Err(Error::SelfReference { entity, id });
    }

    let mut visited: HashSet<CostNode> = HashSet::from([child]);
    let mut frontier: VecDeque<CostNode> = VecDeque::from([child]);
    while let Some(node) = frontier.pop_front() {
        for next in components_of(db, node).await? {
            if next == owner {
                return Err(Error::CompositionCycle { entity, id });
            }
            if visited.insert(next) {
                frontier.push_back(next);
            }
        }
    }

    Ok(())
}

/// Nodes a recipe/product directly contains; ingredients and variations are
/// leaves.
async fn components_of<C: ConnectionTrait>(db: &C, node: CostNode) -> Result<Vec<CostNode>> {
    match node {
        CostNode::Recipe(id) => {
            let items = RecipeItem::find()
                .filter(recipe_item::Column::RecipeId.eq(id))
                .all(db)
                .await?;
            Ok(items
                .into_iter()
                .map(|item| node_for(item.item_kind, item.item_id))
                .collect())
        }
        CostNode::Product(id) => {
            let lines = ProductComposition::find()
                .filter(product_composition::Column::ProductId.eq(id))
                .all(db)
                .await?;
            Ok(lines
                .into_iter()
                .map(|line| node_for(line.item_kind, line.item_id))
                .collect())
        }
        CostNode::Ingredient(_) | CostNode::Variation(_) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{ledger, menu, product, recipe};
    use crate::entities::{Product, Recipe, enums::ApportionmentPolicy};
    use crate::test_utils::*;
    use rust_decimal::Decimal;

    /// The worked example: Flour at 5.00/kg, Dough uses 1000 g and yields two
    /// portions, Pizza contains one Dough. Raising Flour to 6.00/kg must move
    /// every aggregate without any simulation involved.
    #[tokio::test]
    async fn test_price_change_cascades_through_recipe_and_product() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        assert_eq!(flour.base_cost_per_unit, dec("0.005"));

        let dough = recipe::create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::from(2),
            units.count.id,
            0,
        )
        .await?;
        let dough = add_recipe_ingredient(&db, &dough, &flour, 1000, &units).await?;
        assert_eq!(dough.total_cost, dec("5.000"));
        assert_eq!(dough.cost_per_portion, dec("2.500"));

        let pizza = product::create_product(&db, "Pizza".to_string()).await?;
        let pizza = product::upsert_product_composition(
            &db,
            pizza.id,
            None,
            ItemKind::Recipe,
            dough.id,
            Decimal::ONE,
            Some(units.count.id),
        )
        .await?;
        assert_eq!(pizza.base_cost, dec("2.500"));

        ledger::set_manual_price(&db, flour.id, dec("6.00")).await?;

        let dough = Recipe::find_by_id(dough.id).one(&db).await?.unwrap();
        assert_eq!(dough.total_cost, dec("6.000"));
        assert_eq!(dough.cost_per_portion, dec("3.000"));
        let pizza = Product::find_by_id(pizza.id).one(&db).await?.unwrap();
        assert_eq!(pizza.base_cost, dec("3.000"));

        Ok(())
    }

    #[tokio::test]
    async fn test_cascade_reaches_variations_and_menus() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let chicken = ingredient_with_manual_price(&db, "Chicken", &units, "10.00").await?;
        let deboned = crate::core::variation::create_variation(
            &db,
            chicken.id,
            "Deboned".to_string(),
            Decimal::ONE,
            units.kilogram.id,
            Decimal::from(800),
            units.gram.id,
        )
        .await?;

        // a recipe on the variation, and a menu listing on the recipe
        let stew = recipe::create_recipe(
            &db,
            "Stew".to_string(),
            Decimal::from(4),
            units.count.id,
            0,
        )
        .await?;
        let stew = recipe::upsert_recipe_item(
            &db,
            stew.id,
            None,
            ItemKind::Variation,
            deboned.id,
            Decimal::from(400),
            units.gram.id,
        )
        .await?;
        // 400 g x 0.0125 = 5.00 -> 1.25 per portion
        assert_eq!(stew.cost_per_portion, dec("1.25"));

        let lunch = menu::create_menu(
            &db,
            "Lunch".to_string(),
            ApportionmentPolicy::FixedPerProduct,
            Decimal::ZERO,
        )
        .await?;
        let listing = menu::upsert_menu_item(
            &db,
            lunch.id,
            None,
            MenuEntryKind::Recipe,
            stew.id,
            dec("10.00"),
        )
        .await?;
        assert_eq!(listing.total_cost, dec("1.25"));

        ledger::set_manual_price(&db, chicken.id, dec("20.00")).await?;

        let deboned = crate::core::variation::require_variation(&db, deboned.id).await?;
        assert_eq!(deboned.calculated_cost, dec("0.025"));
        let stew = recipe::require_recipe(&db, stew.id).await?;
        assert_eq!(stew.cost_per_portion, dec("2.50"));
        let listing = crate::entities::MenuItem::find_by_id(listing.id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(listing.total_cost, dec("2.50"));
        assert_eq!(listing.margin_value, dec("7.50"));

        Ok(())
    }

    #[tokio::test]
    async fn test_diamond_converges_through_nested_recipes() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;

        // flour -> base dough -> filled dough -> snack (product),
        // and flour -> snack directly: a diamond with two path lengths.
        let base = recipe::create_recipe(
            &db,
            "Base dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;
        let base = add_recipe_ingredient(&db, &base, &flour, 1000, &units).await?;
        assert_eq!(base.cost_per_portion, dec("5.000"));

        let filled = recipe::create_recipe(
            &db,
            "Filled dough".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;
        let filled = recipe::upsert_recipe_item(
            &db,
            filled.id,
            None,
            ItemKind::Recipe,
            base.id,
            Decimal::ONE,
            units.count.id,
        )
        .await?;
        assert_eq!(filled.cost_per_portion, dec("5.000"));

        let snack = product::create_product(&db, "Snack".to_string()).await?;
        product::upsert_product_composition(
            &db,
            snack.id,
            None,
            ItemKind::Recipe,
            filled.id,
            Decimal::ONE,
            Some(units.count.id),
        )
        .await?;
        let snack = product::upsert_product_composition(
            &db,
            snack.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::from(200),
            Some(units.gram.id),
        )
        .await?;
        // 5.00 (filled) + 200 g x 0.005 (flour)
        assert_eq!(snack.base_cost, dec("6.000"));

        ledger::set_manual_price(&db, flour.id, dec("10.00")).await?;

        let snack = product::require_product(&db, snack.id).await?;
        // 10.00 through both recipe hops + 200 g x 0.01 directly
        assert_eq!(snack.base_cost, dec("12.000"));

        Ok(())
    }

    #[tokio::test]
    async fn test_propagation_is_idempotent_and_scoped() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        let sugar = ingredient_with_manual_price(&db, "Sugar", &units, "3.00").await?;

        let dough = recipe::create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::from(2),
            units.count.id,
            0,
        )
        .await?;
        let dough = add_recipe_ingredient(&db, &dough, &flour, 1000, &units).await?;

        let syrup = recipe::create_recipe(
            &db,
            "Syrup".to_string(),
            Decimal::ONE,
            units.count.id,
            0,
        )
        .await?;
        let syrup = add_recipe_ingredient(&db, &syrup, &sugar, 500, &units).await?;
        let syrup_before = syrup.clone();

        // re-running propagation on a converged graph changes no values
        propagate(&db, CostNode::Ingredient(flour.id)).await?;
        let dough_after = recipe::require_recipe(&db, dough.id).await?;
        assert_eq!(dough_after.total_cost, dough.total_cost);
        assert_eq!(dough_after.cost_per_portion, dough.cost_per_portion);

        // an unrelated subgraph is never touched
        let syrup_after = recipe::require_recipe(&db, syrup.id).await?;
        assert_eq!(syrup_after.total_cost, syrup_before.total_cost);
        assert_eq!(syrup_after.updated_at, syrup_before.updated_at);

        Ok(())
    }
}
