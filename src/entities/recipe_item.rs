//! Recipe item entity - One cost-bearing line of a recipe.
//!
//! A line references an ingredient, a variation, or another recipe (never a
//! product). `calculated_cost` caches the line's contribution to the owning
//! recipe's total.

use super::enums::ItemKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipe this line belongs to
    pub recipe_id: i64,
    /// Kind of entity the line references
    pub item_kind: ItemKind,
    /// Id of the referenced ingredient/variation/recipe
    pub item_id: i64,
    /// Quantity used, in `unit_id` units
    pub quantity: Decimal,
    /// Unit the quantity is measured in
    pub unit_id: i64,
    /// Cached cost of this line (quantity in base units x referenced unit cost)
    pub calculated_cost: Decimal,
    /// Position in the recipe's ordered item list
    pub position: i32,
}

/// Defines relationships between `RecipeItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
