//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod enums;
pub mod fixed_cost;
pub mod ingredient;
pub mod menu;
pub mod menu_fee;
pub mod menu_item;
pub mod product;
pub mod product_composition;
pub mod purchase_entry;
pub mod recipe;
pub mod recipe_item;
pub mod recipe_step;
pub mod unit;
pub mod variation;
pub mod workspace_setting;

// Re-export specific types to avoid conflicts
pub use fixed_cost::{Column as FixedCostColumn, Entity as FixedCost, Model as FixedCostModel};
pub use ingredient::{Column as IngredientColumn, Entity as Ingredient, Model as IngredientModel};
pub use menu::{Column as MenuColumn, Entity as Menu, Model as MenuModel};
pub use menu_fee::{Column as MenuFeeColumn, Entity as MenuFee, Model as MenuFeeModel};
pub use menu_item::{Column as MenuItemColumn, Entity as MenuItem, Model as MenuItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_composition::{
    Column as ProductCompositionColumn, Entity as ProductComposition,
    Model as ProductCompositionModel,
};
pub use purchase_entry::{
    Column as PurchaseEntryColumn, Entity as PurchaseEntry, Model as PurchaseEntryModel,
};
pub use recipe::{Column as RecipeColumn, Entity as Recipe, Model as RecipeModel};
pub use recipe_item::{Column as RecipeItemColumn, Entity as RecipeItem, Model as RecipeItemModel};
pub use recipe_step::{Column as RecipeStepColumn, Entity as RecipeStep, Model as RecipeStepModel};
pub use unit::{Column as UnitColumn, Entity as Unit, Model as UnitModel};
pub use variation::{Column as VariationColumn, Entity as Variation, Model as VariationModel};
pub use workspace_setting::{
    Column as WorkspaceSettingColumn, Entity as WorkspaceSetting, Model as WorkspaceSettingModel,
};
