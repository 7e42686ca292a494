//! Budget entity - one envelope of a dashboard for the current period.
//!
//! The transition engine treats a budget row as its unit of mutation: a transition
//! rewrites `spent` and `carried_over` and preserves everything else.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier, shared with the envelope built from it
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dashboard this budget belongs to
    pub dashboard_id: String,
    /// Display name (e.g., "Groceries")
    pub title: String,
    /// Nominal allocation for the period
    pub budget: f64,
    /// Amount consumed during the period
    pub spent: f64,
    /// Amount brought forward from earlier periods
    pub carried_over: f64,
}

impl Model {
    /// `budget + carried_over - spent`; negative when overspent.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.budget + self.carried_over - self.spent
    }
}

/// Budgets have no relations the engine navigates
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
