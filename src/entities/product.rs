//! Product entity - A sellable item assembled from composition lines.
//!
//! `base_cost` is a cache over the composition lines, maintained by the
//! composite aggregator. Products carry no labor charge and no portioning.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Pizza")
    pub name: String,
    /// Cached sum of the composition lines' calculated costs
    pub base_cost: Decimal,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Unordered composition lines
    #[sea_orm(has_many = "super::product_composition::Entity")]
    Compositions,
}

impl Related<super::product_composition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Compositions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
