//! Recipe step entity - Ordered free-text preparation instructions.
//! Steps carry no cost semantics and never trigger recomputation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe step database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_steps")]
pub struct Model {
    /// Unique identifier for the step
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipe this step belongs to
    pub recipe_id: i64,
    /// 1-based position in the preparation order
    pub step_number: i32,
    /// The instruction text
    pub instruction: String,
}

/// Defines relationships between `RecipeStep` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each step belongs to one recipe
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
