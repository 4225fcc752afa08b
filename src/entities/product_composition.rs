//! Product composition entity - One line of a product's bill of materials.
//!
//! A line may reference an ingredient, a variation, a recipe, or another
//! product. Product-kind references carry no unit: their quantity is a plain
//! count of the referenced product.

use super::enums::ItemKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product composition database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_compositions")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product this line belongs to
    pub product_id: i64,
    /// Kind of entity the line references
    pub item_kind: ItemKind,
    /// Id of the referenced ingredient/variation/recipe/product
    pub item_id: i64,
    /// Quantity used; a bare count when the reference is product-kind
    pub quantity: Decimal,
    /// Unit the quantity is measured in; None exactly for product-kind lines
    pub unit_id: Option<i64>,
    /// Cached cost of this line
    pub calculated_cost: Decimal,
}

/// Defines relationships between `ProductComposition` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
