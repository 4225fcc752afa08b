//! Workspace settings business logic.
//!
//! Key-value settings scoped to the workspace. The one the engine consumes is
//! the hourly labor rate charged against recipe prep time; changing it moves
//! the labor cost of every recipe with prep time, so the setter recomputes
//! and cascades from each of them.

use crate::{
    core::{aggregate, cascade, cascade::CostNode},
    entities::{Recipe, WorkspaceSetting, recipe, workspace_setting},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::str::FromStr;
use tracing::debug;

/// Key under which the hourly labor rate is stored.
pub const LABOR_COST_PER_HOUR_KEY: &str = "labor_cost_per_hour";

/// Reads the workspace's hourly labor rate, `None` when it was never set.
pub async fn labor_cost_per_hour<C: ConnectionTrait>(db: &C) -> Result<Option<Decimal>> {
    let row = WorkspaceSetting::find()
        .filter(workspace_setting::Column::Key.eq(LABOR_COST_PER_HOUR_KEY))
        .one(db)
        .await?;

    row.map(|row| {
        Decimal::from_str(&row.value).map_err(|e| Error::Config {
            message: format!("Stored labor rate '{}' is not a decimal: {e}", row.value),
        })
    })
    .transpose()
}

/// Sets the workspace's hourly labor rate and recomputes every recipe whose
/// cost includes a prep-time charge, cascading from each.
pub async fn set_labor_cost_per_hour(
    db: &DatabaseConnection,
    rate: Decimal,
) -> Result<Vec<recipe::Model>> {
    if rate < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Labor rate cannot be negative (got {rate})"),
        });
    }

    let txn = db.begin().await?;

    write_setting(&txn, LABOR_COST_PER_HOUR_KEY, rate.to_string()).await?;

    let with_prep_time = Recipe::find()
        .filter(recipe::Column::PrepTimeMinutes.gt(0))
        .all(&txn)
        .await?;
    debug!(
        rate = %rate,
        recipes = with_prep_time.len(),
        "labor rate changed, recomputing recipes with prep time"
    );
    for stale in &with_prep_time {
        aggregate::recompute_recipe(&txn, stale.id).await?;
        cascade::propagate(&txn, CostNode::Recipe(stale.id)).await?;
    }

    // reload: a recipe may have been recomputed again as part of a later
    // recipe's cascade
    let mut updated = Vec::with_capacity(with_prep_time.len());
    for stale in with_prep_time {
        updated.push(
            Recipe::find_by_id(stale.id)
                .one(&txn)
                .await?
                .ok_or(Error::NotFound {
                    entity: "recipe",
                    id: stale.id,
                })?,
        );
    }

    txn.commit().await?;
    Ok(updated)
}

/// Writes the hourly labor rate only when none is stored yet. Used at startup
/// to apply a rate from costing.toml without stomping a workspace edit.
/// Returns whether a value was written.
pub async fn init_labor_cost_per_hour(db: &DatabaseConnection, rate: Decimal) -> Result<bool> {
    if labor_cost_per_hour(db).await?.is_some() {
        return Ok(false);
    }
    write_setting(db, LABOR_COST_PER_HOUR_KEY, rate.to_string()).await?;
    Ok(true)
}

/// Upserts one key-value setting row.
pub(crate) async fn write_setting<C: ConnectionTrait>(
    db: &C,
    key: &str,
    value: String,
) -> Result<()> {
    let existing = WorkspaceSetting::find()
        .filter(workspace_setting::Column::Key.eq(key))
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();
    match existing {
        Some(row) => {
            let mut active: workspace_setting::ActiveModel = row.into();
            active.value = Set(value);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            let row = workspace_setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                updated_at: Set(now),
                ..Default::default()
            };
            row.insert(db).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_labor_rate_roundtrip() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(labor_cost_per_hour(&db).await?.is_none());

        set_labor_cost_per_hour(&db, dec("30.00")).await?;
        assert_eq!(labor_cost_per_hour(&db).await?, Some(dec("30.00")));

        set_labor_cost_per_hour(&db, dec("42.50")).await?;
        assert_eq!(labor_cost_per_hour(&db).await?, Some(dec("42.50")));

        Ok(())
    }

    #[tokio::test]
    async fn test_init_does_not_stomp_existing_rate() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(init_labor_cost_per_hour(&db, dec("20.00")).await?);
        assert!(!init_labor_cost_per_hour(&db, dec("99.00")).await?);
        assert_eq!(labor_cost_per_hour(&db).await?, Some(dec("20.00")));

        Ok(())
    }

    #[tokio::test]
    async fn test_negative_rate_rejected() -> Result<()> {
        let db = setup_test_db().await?;

        let result = set_labor_cost_per_hour(&db, dec("-1")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_rate_change_moves_recipe_labor_cost() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;

        // 30 minutes of prep, two portions
        let dough = crate::core::recipe::create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::from(2),
            units.count.id,
            30,
        )
        .await?;
        let dough = add_recipe_ingredient(&db, &dough, &flour, 1000, &units).await?;
        assert_eq!(dough.labor_cost, Decimal::ZERO);
        assert_eq!(dough.cost_per_portion, dec("2.50"));

        let updated = set_labor_cost_per_hour(&db, dec("30.00")).await?;
        assert_eq!(updated.len(), 1);
        let dough = &updated[0];
        // 30 min x 30/h = 15.00 labor; (5 + 15) / 2 portions
        assert_eq!(dough.labor_cost, dec("15.00"));
        assert_eq!(dough.cost_per_portion, dec("10.00"));

        Ok(())
    }
}
