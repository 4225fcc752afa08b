//! Product business logic - CRUD for products and their composition lines.
//!
//! A product's bill of materials may reference ingredients, variations,
//! recipes, and other products. Product-kind lines carry a bare count and no
//! unit. Validation, the aggregate rebuild, and the cascade all run inside
//! one transaction, mirroring the recipe side.

use crate::{
    core::{aggregate, cascade, cascade::CostNode, units},
    entities::{
        Product, ProductComposition, enums::ItemKind, product, product_composition,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fetches a product or fails with `NotFound`.
pub(crate) async fn require_product<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "product",
            id: product_id,
        })
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all products, ordered alphabetically by name.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product's composition lines.
pub async fn get_product_compositions(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<product_composition::Model>> {
    ProductComposition::find()
        .filter(product_composition::Column::ProductId.eq(product_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product with an empty composition and zero cost.
pub async fn create_product(db: &DatabaseConnection, name: String) -> Result<product::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let product = product::ActiveModel {
        name: Set(name.trim().to_string()),
        base_cost: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Inserts or updates one composition line and recomputes everything
/// downstream.
///
/// Pass `line_id: None` to add a new line, `Some(id)` to edit an existing
/// one. Product-kind references must carry no unit (their quantity is a
/// plain count); every other kind requires a unit of the referenced item's
/// measurement class.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive
/// - The referenced entity or the unit does not exist
/// - The unit rules above are violated (`Validation` /
///   `IncompatibleMeasurementClass`)
/// - The line would make the product contain itself, directly
///   (`SelfReference`) or through a longer chain (`CompositionCycle`)
pub async fn upsert_product_composition(
    db: &DatabaseConnection,
    product_id: i64,
    line_id: Option<i64>,
    item_kind: ItemKind,
    item_id: i64,
    quantity: Decimal,
    unit_id: Option<i64>,
) -> Result<product::Model> {
    if quantity <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("Composition quantity must be positive (got {quantity})"),
        });
    }

    let txn = db.begin().await?;

    require_product(&txn, product_id).await?;
    cascade::ensure_no_cycle(
        &txn,
        CostNode::Product(product_id),
        cascade::node_for(item_kind, item_id),
    )
    .await?;

    // referenced_class also proves the referenced entity exists
    let expected = aggregate::referenced_class(&txn, item_kind, item_id).await?;
    let unit_id = match (expected, unit_id) {
        (Some(expected), Some(unit_id)) => {
            let unit = units::get_unit(&txn, unit_id).await?;
            units::ensure_class(&unit, expected)?;
            Some(unit_id)
        }
        (Some(_), None) => {
            return Err(Error::Validation {
                message: "This composition line requires a unit".to_string(),
            });
        }
        (None, Some(_)) => {
            return Err(Error::Validation {
                message: "Product references carry a bare count, not a unit".to_string(),
            });
        }
        (None, None) => None,
    };

    let cost = aggregate::line_cost(&txn, item_kind, item_id, quantity, unit_id).await?;

    match line_id {
        Some(line_id) => {
            let line = ProductComposition::find_by_id(line_id)
                .one(&txn)
                .await?
                .filter(|line| line.product_id == product_id)
                .ok_or(Error::NotFound {
                    entity: "product composition",
                    id: line_id,
                })?;
            let mut active: product_composition::ActiveModel = line.into();
            active.item_kind = Set(item_kind);
            active.item_id = Set(item_id);
            active.quantity = Set(quantity);
            active.unit_id = Set(unit_id);
            active.calculated_cost = Set(cost);
            active.update(&txn).await?;
        }
        None => {
            let line = product_composition::ActiveModel {
                product_id: Set(product_id),
                item_kind: Set(item_kind),
                item_id: Set(item_id),
                quantity: Set(quantity),
                unit_id: Set(unit_id),
                calculated_cost: Set(cost),
                ..Default::default()
            };
            line.insert(&txn).await?;
        }
    }

    aggregate::recompute_product(&txn, product_id).await?;
    cascade::propagate(&txn, CostNode::Product(product_id)).await?;

    let product = require_product(&txn, product_id).await?;
    txn.commit().await?;

    Ok(product)
}

/// Deletes one composition line and recomputes everything downstream.
pub async fn delete_product_composition(
    db: &DatabaseConnection,
    line_id: i64,
) -> Result<product::Model> {
    let txn = db.begin().await?;

    let line = ProductComposition::find_by_id(line_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "product composition",
            id: line_id,
        })?;
    let product_id = line.product_id;
    line.delete(&txn).await?;

    aggregate::recompute_product(&txn, product_id).await?;
    cascade::propagate(&txn, CostNode::Product(product_id)).await?;

    let product = require_product(&txn, product_id).await?;
    txn.commit().await?;

    Ok(product)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::recipe;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_product_sums_mixed_composition() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;
        let milk = volume_ingredient_with_manual_price(&db, "Milk", &units, "4.00").await?;

        let kit = create_product(&db, "Baking kit".to_string()).await?;
        let kit = upsert_product_composition(
            &db,
            kit.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::from(2),
            Some(units.kilogram.id),
        )
        .await?;
        let kit = upsert_product_composition(
            &db,
            kit.id,
            None,
            ItemKind::Ingredient,
            milk.id,
            Decimal::ONE,
            Some(units.liter.id),
        )
        .await?;

        // 2 kg x 5.00/kg + 1 L x 4.00/L
        assert_eq!(kit.base_cost, dec("14.000"));
        let lines = get_product_compositions(&db, kit.id).await?;
        let sum: Decimal = lines.iter().map(|line| line.calculated_cost).sum();
        assert_eq!(kit.base_cost, sum);

        Ok(())
    }

    #[tokio::test]
    async fn test_nested_product_uses_bare_count() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;

        let dough_kit = create_product(&db, "Dough kit".to_string()).await?;
        let dough_kit = upsert_product_composition(
            &db,
            dough_kit.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::ONE,
            Some(units.kilogram.id),
        )
        .await?;
        assert_eq!(dough_kit.base_cost, dec("5.000"));

        let combo = create_product(&db, "Combo".to_string()).await?;
        let combo = upsert_product_composition(
            &db,
            combo.id,
            None,
            ItemKind::Product,
            dough_kit.id,
            Decimal::from(3),
            None,
        )
        .await?;
        assert_eq!(combo.base_cost, dec("15.000"));

        // a unit on a product reference is rejected
        let result = upsert_product_composition(
            &db,
            combo.id,
            None,
            ItemKind::Product,
            dough_kit.id,
            Decimal::ONE,
            Some(units.count.id),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_product_cycle_rejected_at_insertion() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_product(&db, "A".to_string()).await?;
        let b = create_product(&db, "B".to_string()).await?;

        upsert_product_composition(&db, a.id, None, ItemKind::Product, b.id, Decimal::ONE, None)
            .await?;

        // direct self-reference
        let result =
            upsert_product_composition(&db, a.id, None, ItemKind::Product, a.id, Decimal::ONE, None)
                .await;
        assert!(matches!(result.unwrap_err(), Error::SelfReference { .. }));

        // B containing A would close A -> B -> A
        let result =
            upsert_product_composition(&db, b.id, None, ItemKind::Product, a.id, Decimal::ONE, None)
                .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::CompositionCycle {
                entity: "product",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_product_with_recipe_line_tracks_portion_cost() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;

        let dough = recipe::create_recipe(
            &db,
            "Dough".to_string(),
            Decimal::from(2),
            units.count.id,
            0,
        )
        .await?;
        let dough = add_recipe_ingredient(&db, &dough, &flour, 1000, &units).await?;
        assert_eq!(dough.cost_per_portion, dec("2.500"));

        let pizza = create_product(&db, "Pizza".to_string()).await?;
        let pizza = upsert_product_composition(
            &db,
            pizza.id,
            None,
            ItemKind::Recipe,
            dough.id,
            Decimal::from(2),
            Some(units.count.id),
        )
        .await?;
        assert_eq!(pizza.base_cost, dec("5.000"));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_composition_recomputes() -> Result<()> {
        let (db, units) = setup_with_units().await?;
        let flour = ingredient_with_manual_price(&db, "Flour", &units, "5.00").await?;

        let kit = create_product(&db, "Kit".to_string()).await?;
        let kit = upsert_product_composition(
            &db,
            kit.id,
            None,
            ItemKind::Ingredient,
            flour.id,
            Decimal::ONE,
            Some(units.kilogram.id),
        )
        .await?;
        assert_eq!(kit.base_cost, dec("5.000"));

        let lines = get_product_compositions(&db, kit.id).await?;
        let kit = delete_product_composition(&db, lines[0].id).await?;
        assert_eq!(kit.base_cost, Decimal::ZERO);

        Ok(())
    }
}
