//! Income entity - a single incoming transaction, recurring when `is_fixed`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Income database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    /// Unique identifier for the income
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dashboard this income belongs to
    pub dashboard_id: String,
    /// Human-readable description (e.g., "Salary")
    pub title: String,
    /// Amount received
    pub amount: f64,
    /// Day the income was booked
    pub date: Date,
    /// Whether this is a recurring ("fixed") income
    pub is_fixed: bool,
}

/// Incomes have no relations the engine navigates
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
