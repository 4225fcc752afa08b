//! Menu pricing business logic - Costs, fees, apportionment, and margins.
//!
//! A menu item's total cost is the underlying item cost plus the menu's
//! active fees plus an apportioned share of the workspace's fixed costs.
//! Repricing is menu-scoped: editing a fee or the apportionment policy
//! re-runs the calculator for every item on that menu, and the cost cascade
//! calls back in for every item that points at a touched node.

use crate::{
    core::{cascade::CostNode, ledger, product, recipe},
    entities::{
        FixedCost, Menu, MenuFee, MenuItem,
        enums::{ApportionmentPolicy, FeeKind, MenuEntryKind},
        fixed_cost, menu, menu_fee, menu_item,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;

/// Result of pricing one menu item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceComponents {
    /// Item cost + fees + apportioned fixed cost
    pub total_cost: Decimal,
    /// Sale price minus total cost
    pub margin_value: Decimal,
    /// Margin as a percentage of the sale price (0 when sale price <= 0)
    pub margin_percentage: Decimal,
}

/// Prices one sale: applies the menu's active fees and its fixed-cost
/// apportionment policy on top of the underlying item cost.
#[must_use]
pub fn price_components(
    item_cost: Decimal,
    sale_price: Decimal,
    fees: &[menu_fee::Model],
    policy: ApportionmentPolicy,
    policy_value: Decimal,
    total_active_fixed: Decimal,
) -> PriceComponents {
    let mut fixed_fees = Decimal::ZERO;
    let mut percentage_fees = Decimal::ZERO;
    for fee in fees.iter().filter(|fee| fee.active) {
        match fee.kind {
            FeeKind::Fixed => fixed_fees += fee.value,
            FeeKind::Percentage => percentage_fees += fee.value,
        }
    }
    let fees_cost = fixed_fees + sale_price * percentage_fees / Decimal::ONE_HUNDRED;

    let apportioned = match policy {
        ApportionmentPolicy::PercentageOfSale => sale_price * policy_value / Decimal::ONE_HUNDRED,
        ApportionmentPolicy::FixedPerProduct => policy_value,
        // policy_value is the estimated monthly unit sales; unset or zero
        // means no apportionment
        ApportionmentPolicy::ProportionalToSales => {
            if policy_value > Decimal::ZERO {
                total_active_fixed
                    .checked_div(policy_value)
                    .unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            }
        }
    };

    let total_cost = item_cost + fees_cost + apportioned;
    let margin_value = sale_price - total_cost;
    let margin_percentage = if sale_price > Decimal::ZERO {
        margin_value
            .checked_div(sale_price)
            .unwrap_or(Decimal::ZERO)
            * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    PriceComponents {
        total_cost,
        margin_value,
        margin_percentage,
    }
}

/// Sale price that would preserve the given margin percentage on a cost.
///
/// # Errors
/// Returns `InvalidMargin` when the requested margin is 100% or more - no
/// finite price can achieve it.
pub fn price_for_target_margin(cost: Decimal, margin_percentage: Decimal) -> Result<Decimal> {
    if margin_percentage >= Decimal::ONE_HUNDRED {
        return Err(Error::InvalidMargin { margin_percentage });
    }
    let remainder = Decimal::ONE - margin_percentage / Decimal::ONE_HUNDRED;
    cost.checked_div(remainder)
        .ok_or(Error::InvalidMargin { margin_percentage })
}

/// Fetches a menu or fails with `NotFound`.
pub(crate) async fn require_menu<C: ConnectionTrait>(db: &C, menu_id: i64) -> Result<menu::Model> {
    Menu::find_by_id(menu_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "menu",
            id: menu_id,
        })
}

/// Creates a new menu with the given apportionment policy.
pub async fn create_menu(
    db: &DatabaseConnection,
    name: String,
    apportionment_policy: ApportionmentPolicy,
    policy_value: Decimal,
) -> Result<menu::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Menu name cannot be empty".to_string(),
        });
    }
    validate_policy_value(policy_value)?;

    let now = chrono::Utc::now().naive_utc();
    let menu = menu::ActiveModel {
        name: Set(name.trim().to_string()),
        apportionment_policy: Set(apportionment_policy),
        policy_value: Set(policy_value),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    menu.insert(db).await.map_err(Into::into)
}

/// Retrieves all items listed on a menu.
pub async fn get_menu_items(
    db: &DatabaseConnection,
    menu_id: i64,
) -> Result<Vec<menu_item::Model>> {
    MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .order_by_asc(menu_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists or re-prices an item on a menu.
///
/// Pass `line_id: None` to list a new item, `Some(id)` to change an existing
/// listing's target or sale price. The cached cost and margins are computed
/// immediately from the referenced item's current cost.
pub async fn upsert_menu_item(
    db: &DatabaseConnection,
    menu_id: i64,
    line_id: Option<i64>,
    item_kind: MenuEntryKind,
    item_id: i64,
    sale_price: Decimal,
) -> Result<menu_item::Model> {
    if sale_price < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Sale price cannot be negative (got {sale_price})"),
        });
    }

    let txn = db.begin().await?;

    let menu = require_menu(&txn, menu_id).await?;
    let item_cost = menu_cost_basis(&txn, item_kind, item_id).await?;
    let fees = fees_for_menu(&txn, menu_id).await?;
    let total_fixed = total_active_fixed_costs(&txn).await?;
    let pricing = price_components(
        item_cost,
        sale_price,
        &fees,
        menu.apportionment_policy,
        menu.policy_value,
        total_fixed,
    );

    let now = chrono::Utc::now().naive_utc();
    let written = match line_id {
        Some(line_id) => {
            let listing = MenuItem::find_by_id(line_id)
                .one(&txn)
                .await?
                .filter(|listing| listing.menu_id == menu_id)
                .ok_or(Error::NotFound {
                    entity: "menu item",
                    id: line_id,
                })?;
            let mut active: menu_item::ActiveModel = listing.into();
            active.item_kind = Set(item_kind);
            active.item_id = Set(item_id);
            active.sale_price = Set(sale_price);
            active.total_cost = Set(pricing.total_cost);
            active.margin_value = Set(pricing.margin_value);
            active.margin_percentage = Set(pricing.margin_percentage);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            let listing = menu_item::ActiveModel {
                menu_id: Set(menu_id),
                item_kind: Set(item_kind),
                item_id: Set(item_id),
                sale_price: Set(sale_price),
                total_cost: Set(pricing.total_cost),
                margin_value: Set(pricing.margin_value),
                margin_percentage: Set(pricing.margin_percentage),
                updated_at: Set(now),
                ..Default::default()
            };
            listing.insert(&txn).await?
        }
    };

    txn.commit().await?;
    Ok(written)
}

/// Removes a listing from a menu. Nothing downstream depends on a listing,
/// so no recomputation is needed.
pub async fn delete_menu_item(db: &DatabaseConnection, line_id: i64) -> Result<()> {
    let listing = MenuItem::find_by_id(line_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "menu item",
            id: line_id,
        })?;
    listing.delete(db).await?;
    Ok(())
}

/// Creates or edits a fee and re-prices every item on the menu.
pub async fn upsert_menu_fee(
    db: &DatabaseConnection,
    menu_id: i64,
    fee_id: Option<i64>,
    name: String,
    kind: FeeKind,
    value: Decimal,
    active: bool,
) -> Result<(menu_fee::Model, Vec<menu_item::Model>)> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Fee name cannot be empty".to_string(),
        });
    }
    if value < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Fee value cannot be negative (got {value})"),
        });
    }

    let txn = db.begin().await?;

    require_menu(&txn, menu_id).await?;

    let written = match fee_id {
        Some(fee_id) => {
            let fee = MenuFee::find_by_id(fee_id)
                .one(&txn)
                .await?
                .filter(|fee| fee.menu_id == menu_id)
                .ok_or(Error::NotFound {
                    entity: "menu fee",
                    id: fee_id,
                })?;
            let mut fee_active: menu_fee::ActiveModel = fee.into();
            fee_active.name = Set(name.trim().to_string());
            fee_active.kind = Set(kind);
            fee_active.value = Set(value);
            fee_active.active = Set(active);
            fee_active.update(&txn).await?
        }
        None => {
            let fee = menu_fee::ActiveModel {
                menu_id: Set(menu_id),
                name: Set(name.trim().to_string()),
                kind: Set(kind),
                value: Set(value),
                active: Set(active),
                ..Default::default()
            };
            fee.insert(&txn).await?
        }
    };

    let items = reprice_menu(&txn, menu_id).await?;
    txn.commit().await?;

    Ok((written, items))
}

/// Deletes a fee and re-prices every item on the menu.
pub async fn delete_menu_fee(
    db: &DatabaseConnection,
    fee_id: i64,
) -> Result<Vec<menu_item::Model>> {
    let txn = db.begin().await?;

    let fee = MenuFee::find_by_id(fee_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "menu fee",
            id: fee_id,
        })?;
    let menu_id = fee.menu_id;
    fee.delete(&txn).await?;

    let items = reprice_menu(&txn, menu_id).await?;
    txn.commit().await?;

    Ok(items)
}

/// Changes a menu's apportionment policy and re-prices every item on it.
pub async fn set_menu_apportionment(
    db: &DatabaseConnection,
    menu_id: i64,
    apportionment_policy: ApportionmentPolicy,
    policy_value: Decimal,
) -> Result<Vec<menu_item::Model>> {
    validate_policy_value(policy_value)?;

    let txn = db.begin().await?;

    let menu = require_menu(&txn, menu_id).await?;
    let mut active: menu::ActiveModel = menu.into();
    active.apportionment_policy = Set(apportionment_policy);
    active.policy_value = Set(policy_value);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&txn).await?;

    let items = reprice_menu(&txn, menu_id).await?;
    txn.commit().await?;

    Ok(items)
}

/// Creates or edits a workspace fixed cost, then re-prices every menu whose
/// apportionment divides fixed costs across sales.
pub async fn upsert_fixed_cost(
    db: &DatabaseConnection,
    fixed_cost_id: Option<i64>,
    name: String,
    monthly_value: Decimal,
    active: bool,
) -> Result<fixed_cost::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Fixed cost name cannot be empty".to_string(),
        });
    }
    if monthly_value < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Monthly value cannot be negative (got {monthly_value})"),
        });
    }

    let txn = db.begin().await?;

    let written = match fixed_cost_id {
        Some(fixed_cost_id) => {
            let cost = FixedCost::find_by_id(fixed_cost_id)
                .one(&txn)
                .await?
                .ok_or(Error::NotFound {
                    entity: "fixed cost",
                    id: fixed_cost_id,
                })?;
            let mut cost_active: fixed_cost::ActiveModel = cost.into();
            cost_active.name = Set(name.trim().to_string());
            cost_active.monthly_value = Set(monthly_value);
            cost_active.active = Set(active);
            cost_active.update(&txn).await?
        }
        None => {
            let cost = fixed_cost::ActiveModel {
                name: Set(name.trim().to_string()),
                monthly_value: Set(monthly_value),
                active: Set(active),
                ..Default::default()
            };
            cost.insert(&txn).await?
        }
    };

    let affected_menus = Menu::find()
        .filter(menu::Column::ApportionmentPolicy.eq(ApportionmentPolicy::ProportionalToSales))
        .all(&txn)
        .await?;
    for menu in affected_menus {
        reprice_menu(&txn, menu.id).await?;
    }

    txn.commit().await?;
    Ok(written)
}

/// The cost the menu calculator starts from: one base unit of an ingredient,
/// one portion of a recipe, or one unit of a product.
pub(crate) async fn menu_cost_basis<C: ConnectionTrait>(
    db: &C,
    item_kind: MenuEntryKind,
    item_id: i64,
) -> Result<Decimal> {
    match item_kind {
        MenuEntryKind::Ingredient => Ok(ledger::require_ingredient(db, item_id)
            .await?
            .base_cost_per_unit),
        MenuEntryKind::Recipe => Ok(recipe::require_recipe(db, item_id).await?.cost_per_portion),
        MenuEntryKind::Product => Ok(product::require_product(db, item_id).await?.base_cost),
    }
}

/// Sum of all active workspace fixed costs.
pub(crate) async fn total_active_fixed_costs<C: ConnectionTrait>(db: &C) -> Result<Decimal> {
    let costs = FixedCost::find()
        .filter(fixed_cost::Column::Active.eq(true))
        .all(db)
        .await?;
    Ok(costs.iter().map(|cost| cost.monthly_value).sum())
}

/// Re-prices every item on one menu from current costs, fees, and policy.
pub(crate) async fn reprice_menu<C: ConnectionTrait>(
    db: &C,
    menu_id: i64,
) -> Result<Vec<menu_item::Model>> {
    let menu = require_menu(db, menu_id).await?;
    let fees = fees_for_menu(db, menu_id).await?;
    let total_fixed = total_active_fixed_costs(db).await?;

    let items = MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .all(db)
        .await?;

    let mut repriced = Vec::with_capacity(items.len());
    for item in items {
        repriced.push(reprice_one(db, &menu, &fees, total_fixed, item).await?);
    }
    Ok(repriced)
}

/// Re-prices every listing that points directly at the given node. Called by
/// the cascade for the source and every owner it recomputed.
pub(crate) async fn reprice_items_for<C: ConnectionTrait>(db: &C, node: CostNode) -> Result<()> {
    let Some(item_kind) = node.menu_entry_kind() else {
        return Ok(());
    };

    let items = MenuItem::find()
        .filter(menu_item::Column::ItemKind.eq(item_kind))
        .filter(menu_item::Column::ItemId.eq(node.id()))
        .all(db)
        .await?;
    if items.is_empty() {
        return Ok(());
    }

    let total_fixed = total_active_fixed_costs(db).await?;
    let mut menus: HashMap<i64, (menu::Model, Vec<menu_fee::Model>)> = HashMap::new();
    for item in items {
        if !menus.contains_key(&item.menu_id) {
            let menu = require_menu(db, item.menu_id).await?;
            let fees = fees_for_menu(db, item.menu_id).await?;
            menus.insert(item.menu_id, (menu, fees));
        }
        if let Some((menu, fees)) = menus.get(&item.menu_id) {
            reprice_one(db, menu, fees, total_fixed, item).await?;
        }
    }
    Ok(())
}

/// Recomputes one listing's cached pricing, writing only when it moved.
async fn reprice_one<C: ConnectionTrait>(
    db: &C,
    menu: &menu::Model,
    fees: &[menu_fee::Model],
    total_fixed: Decimal,
    item: menu_item::Model,
) -> Result<menu_item::Model> {
    let item_cost = menu_cost_basis(db, item.item_kind, item.item_id).await?;
    let pricing = price_components(
        item_cost,
        item.sale_price,
        fees,
        menu.apportionment_policy,
        menu.policy_value,
        total_fixed,
    );

    if pricing.total_cost == item.total_cost
        && pricing.margin_value == item.margin_value
        && pricing.margin_percentage == item.margin_percentage
    {
        return Ok(item);
    }

    let mut active: menu_item::ActiveModel = item.into();
    active.total_cost = Set(pricing.total_cost);
    active.margin_value = Set(pricing.margin_value);
    active.margin_percentage = Set(pricing.margin_percentage);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await.map_err(Into::into)
}

/// All fees configured on a menu, active or not; `price_components` filters.
async fn fees_for_menu<C: ConnectionTrait>(
    db: &C,
    menu_id: i64,
) -> Result<Vec<menu_fee::Model>> {
    MenuFee::find()
        .filter(menu_fee::Column::MenuId.eq(menu_id))
        .all(db)
        .await
        .map_err(Into::into)
}

fn validate_policy_value(policy_value: Decimal) -> Result<()> {
    if policy_value < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Policy value cannot be negative (got {policy_value})"),
        });
    }
    Ok(())
}
