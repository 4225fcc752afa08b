//! Fixed cost entity - A workspace-scoped monthly overhead (rent, utilities).
//!
//! Active fixed costs feed the proportional-to-sales apportionment policy.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed cost database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fixed_costs")]
pub struct Model {
    /// Unique identifier for the fixed cost
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the overhead (e.g., "Rent")
    pub name: String,
    /// Monthly currency amount
    pub monthly_value: Decimal,
    /// Inactive costs are kept but excluded from apportionment
    pub active: bool,
}

/// `FixedCost` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
