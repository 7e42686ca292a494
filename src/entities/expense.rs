//! Expense entity - a single outgoing transaction.
//!
//! Expenses flagged `is_fixed` are recurring and survive a period roll-over with
//! their date advanced; all others are deleted at the turn of the period.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dashboard this expense belongs to
    pub dashboard_id: String,
    /// Human-readable description
    pub title: String,
    /// Amount spent
    pub amount: f64,
    /// Day the expense was booked
    pub date: Date,
    /// Category the expense counts against, if any
    pub category_id: Option<i64>,
    /// Whether this is a recurring ("fixed") expense
    pub is_fixed: bool,
}

/// Expenses reference categories by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
