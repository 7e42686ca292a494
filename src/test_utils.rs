//! Shared test utilities.
//!
//! This module provides helpers for setting up test databases, creating records
//! with sensible defaults, and a [`RecordingStore`] that observes and sabotages
//! persistence calls.

use crate::{
    core::{preferences::TransitionPreference, store::BudgetStore},
    entities::{budget, category, expense, income},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a valid calendar date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// An unsaved budget record on dashboard `"home"`.
pub fn budget_record(
    id: i64,
    title: &str,
    budget: f64,
    spent: f64,
    carried_over: f64,
) -> budget::Model {
    budget::Model {
        id,
        dashboard_id: "home".to_string(),
        title: title.to_string(),
        budget,
        spent,
        carried_over,
    }
}

/// Inserts a budget.
pub async fn create_budget(
    db: &DatabaseConnection,
    dashboard_id: &str,
    title: &str,
    budget: f64,
    spent: f64,
    carried_over: f64,
) -> Result<budget::Model> {
    budget::ActiveModel {
        dashboard_id: Set(dashboard_id.to_string()),
        title: Set(title.to_string()),
        budget: Set(budget),
        spent: Set(spent),
        carried_over: Set(carried_over),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a category.
pub async fn create_category(
    db: &DatabaseConnection,
    dashboard_id: &str,
    name: &str,
    spent: f64,
) -> Result<category::Model> {
    category::ActiveModel {
        dashboard_id: Set(dashboard_id.to_string()),
        name: Set(name.to_string()),
        spent: Set(spent),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds an uncategorized expense through a store.
pub async fn create_expense<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    title: &str,
    amount: f64,
    date: NaiveDate,
    is_fixed: bool,
) -> Result<expense::Model> {
    store
        .add_expense(&expense::Model {
            id: 0,
            dashboard_id: dashboard_id.to_string(),
            title: title.to_string(),
            amount,
            date,
            category_id: None,
            is_fixed,
        })
        .await
}

/// Adds an income through a store.
pub async fn create_income<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    title: &str,
    amount: f64,
    date: NaiveDate,
    is_fixed: bool,
) -> Result<income::Model> {
    store
        .add_income(&income::Model {
            id: 0,
            dashboard_id: dashboard_id.to_string(),
            title: title.to_string(),
            amount,
            date,
            is_fixed,
        })
        .await
}

/// Wraps a store, records budget updates and expense deletes, and fails the
/// calls it is told to fail.
pub struct RecordingStore<S> {
    inner: S,
    updated_budgets: Mutex<Vec<i64>>,
    deleted_expenses: Mutex<Vec<i64>>,
    failing_budget_ids: Vec<i64>,
    failing_expense_ids: Vec<i64>,
    fail_preference_save: bool,
}

#[allow(clippy::unwrap_used)]
impl<S> RecordingStore<S> {
    /// Records everything and fails nothing.
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            updated_budgets: Mutex::new(Vec::new()),
            deleted_expenses: Mutex::new(Vec::new()),
            failing_budget_ids: Vec::new(),
            failing_expense_ids: Vec::new(),
            fail_preference_save: false,
        }
    }

    /// Makes every update of budget `id` fail.
    pub fn failing_budget_update(mut self, id: i64) -> Self {
        self.failing_budget_ids.push(id);
        self
    }

    /// Makes every delete of expense `id` fail.
    pub fn failing_expense_delete(mut self, id: i64) -> Self {
        self.failing_expense_ids.push(id);
        self
    }

    /// Makes every preference save fail.
    pub fn failing_preference_save(mut self) -> Self {
        self.fail_preference_save = true;
        self
    }

    /// Ids passed to `update_budget`, including failed attempts, in call order.
    pub fn updated_budget_ids(&self) -> Vec<i64> {
        self.updated_budgets.lock().unwrap().clone()
    }

    /// Ids passed to `delete_expense`, in call order.
    pub fn deleted_expense_ids(&self) -> Vec<i64> {
        self.deleted_expenses.lock().unwrap().clone()
    }
}

#[allow(clippy::unwrap_used)]
impl<S: BudgetStore> BudgetStore for RecordingStore<S> {
    async fn get_budgets(&self, dashboard_id: &str) -> Result<Vec<budget::Model>> {
        self.inner.get_budgets(dashboard_id).await
    }

    async fn update_budget(&self, budget: &budget::Model) -> Result<()> {
        self.updated_budgets.lock().unwrap().push(budget.id);
        if self.failing_budget_ids.contains(&budget.id) {
            return Err(Error::write("budget", budget.id, "injected failure"));
        }
        self.inner.update_budget(budget).await
    }

    async fn get_expenses(&self, dashboard_id: &str) -> Result<Vec<expense::Model>> {
        self.inner.get_expenses(dashboard_id).await
    }

    async fn add_expense(&self, expense: &expense::Model) -> Result<expense::Model> {
        self.inner.add_expense(expense).await
    }

    async fn update_expense(&self, expense: &expense::Model) -> Result<()> {
        self.inner.update_expense(expense).await
    }

    async fn delete_expense(&self, dashboard_id: &str, id: i64) -> Result<bool> {
        self.deleted_expenses.lock().unwrap().push(id);
        if self.failing_expense_ids.contains(&id) {
            return Err(Error::write("expense", id, "injected failure"));
        }
        self.inner.delete_expense(dashboard_id, id).await
    }

    async fn get_incomes(&self, dashboard_id: &str) -> Result<Vec<income::Model>> {
        self.inner.get_incomes(dashboard_id).await
    }

    async fn add_income(&self, income: &income::Model) -> Result<income::Model> {
        self.inner.add_income(income).await
    }

    async fn update_income(&self, income: &income::Model) -> Result<()> {
        self.inner.update_income(income).await
    }

    async fn delete_income(&self, dashboard_id: &str, id: i64) -> Result<bool> {
        self.inner.delete_income(dashboard_id, id).await
    }

    async fn get_categories(&self, dashboard_id: &str) -> Result<Vec<category::Model>> {
        self.inner.get_categories(dashboard_id).await
    }

    async fn update_category(&self, category: &category::Model) -> Result<()> {
        self.inner.update_category(category).await
    }

    async fn get_transition_preferences(
        &self,
        dashboard_id: &str,
    ) -> Result<Option<Vec<TransitionPreference>>> {
        self.inner.get_transition_preferences(dashboard_id).await
    }

    async fn save_transition_preferences(
        &self,
        dashboard_id: &str,
        preferences: &[TransitionPreference],
    ) -> Result<()> {
        if self.fail_preference_save {
            return Err(Error::Config {
                message: "injected failure".to_string(),
            });
        }
        self.inner
            .save_transition_preferences(dashboard_id, preferences)
            .await
    }

    async fn get_state_value(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_state_value(key).await
    }

    async fn set_state_value(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_state_value(key, value).await
    }
}
