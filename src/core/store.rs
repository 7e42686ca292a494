//! Persistence collaborator used by the transition engine.
//!
//! [`BudgetStore`] is the whole contract the engine needs from storage. Every read
//! is scoped by an explicit dashboard id. [`SeaOrmStore`] implements it over any
//! `SeaORM` connection; handing it a `DatabaseTransaction` lets the caller commit or
//! roll back a whole transition at once.

use crate::{
    core::preferences::TransitionPreference,
    entities::{
        Budget, Category, Expense, Income, SystemState, budget, category, expense, income,
        system_state,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveValue::Unchanged, QueryOrder, Set, prelude::*};
use tracing::debug;

const PREFERENCES_KEY_PREFIX: &str = "transition_preferences:";

/// Storage operations the transition engine depends on.
///
/// All calls may fail; implementations report failures instead of swallowing them.
#[allow(async_fn_in_trait)]
pub trait BudgetStore {
    /// All budgets of a dashboard.
    async fn get_budgets(&self, dashboard_id: &str) -> Result<Vec<budget::Model>>;
    /// Replaces a budget record wholesale. Fails if the record does not exist.
    async fn update_budget(&self, budget: &budget::Model) -> Result<()>;

    /// All expenses of a dashboard.
    async fn get_expenses(&self, dashboard_id: &str) -> Result<Vec<expense::Model>>;
    /// Inserts an expense, ignoring its `id`, and returns the stored record.
    async fn add_expense(&self, expense: &expense::Model) -> Result<expense::Model>;
    /// Replaces an expense record wholesale. Fails if the record does not exist.
    async fn update_expense(&self, expense: &expense::Model) -> Result<()>;
    /// Deletes an expense; `Ok(false)` when nothing matched.
    async fn delete_expense(&self, dashboard_id: &str, id: i64) -> Result<bool>;

    /// All incomes of a dashboard.
    async fn get_incomes(&self, dashboard_id: &str) -> Result<Vec<income::Model>>;
    /// Inserts an income, ignoring its `id`, and returns the stored record.
    async fn add_income(&self, income: &income::Model) -> Result<income::Model>;
    /// Replaces an income record wholesale. Fails if the record does not exist.
    async fn update_income(&self, income: &income::Model) -> Result<()>;
    /// Deletes an income; `Ok(false)` when nothing matched.
    async fn delete_income(&self, dashboard_id: &str, id: i64) -> Result<bool>;

    /// All categories of a dashboard.
    async fn get_categories(&self, dashboard_id: &str) -> Result<Vec<category::Model>>;
    /// Replaces a category record wholesale. Fails if the record does not exist.
    async fn update_category(&self, category: &category::Model) -> Result<()>;

    /// Saved preferences, or `None` if nothing was ever saved for the dashboard.
    async fn get_transition_preferences(
        &self,
        dashboard_id: &str,
    ) -> Result<Option<Vec<TransitionPreference>>>;
    /// Replaces the whole preference set of the dashboard in one write.
    async fn save_transition_preferences(
        &self,
        dashboard_id: &str,
        preferences: &[TransitionPreference],
    ) -> Result<()>;

    /// Reads a bookkeeping value.
    async fn get_state_value(&self, key: &str) -> Result<Option<String>>;
    /// Inserts or overwrites a bookkeeping value.
    async fn set_state_value(&self, key: &str, value: &str) -> Result<()>;
}

/// [`BudgetStore`] backed by a `SeaORM` connection or transaction.
#[derive(Debug)]
pub struct SeaOrmStore<'a, C> {
    conn: &'a C,
}

impl<'a, C> SeaOrmStore<'a, C>
where
    C: ConnectionTrait,
{
    /// Wraps a borrowed connection.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

fn preferences_key(dashboard_id: &str) -> String {
    format!("{PREFERENCES_KEY_PREFIX}{dashboard_id}")
}

impl<C> BudgetStore for SeaOrmStore<'_, C>
where
    C: ConnectionTrait,
{
    async fn get_budgets(&self, dashboard_id: &str) -> Result<Vec<budget::Model>> {
        Budget::find()
            .filter(budget::Column::DashboardId.eq(dashboard_id))
            .order_by_asc(budget::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    async fn update_budget(&self, record: &budget::Model) -> Result<()> {
        let active_model = budget::ActiveModel {
            id: Unchanged(record.id),
            dashboard_id: Set(record.dashboard_id.clone()),
            title: Set(record.title.clone()),
            budget: Set(record.budget),
            spent: Set(record.spent),
            carried_over: Set(record.carried_over),
        };
        active_model
            .update(self.conn)
            .await
            .map_err(|e| Error::write("budget", record.id, e))?;
        debug!(
            "Updated budget {} (spent {:.2}, carried over {:.2})",
            record.id, record.spent, record.carried_over
        );
        Ok(())
    }

    async fn get_expenses(&self, dashboard_id: &str) -> Result<Vec<expense::Model>> {
        Expense::find()
            .filter(expense::Column::DashboardId.eq(dashboard_id))
            .order_by_asc(expense::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    async fn add_expense(&self, record: &expense::Model) -> Result<expense::Model> {
        let active_model = expense::ActiveModel {
            dashboard_id: Set(record.dashboard_id.clone()),
            title: Set(record.title.clone()),
            amount: Set(record.amount),
            date: Set(record.date),
            category_id: Set(record.category_id),
            is_fixed: Set(record.is_fixed),
            ..Default::default()
        };
        active_model.insert(self.conn).await.map_err(Into::into)
    }

    async fn update_expense(&self, record: &expense::Model) -> Result<()> {
        let active_model = expense::ActiveModel {
            id: Unchanged(record.id),
            dashboard_id: Set(record.dashboard_id.clone()),
            title: Set(record.title.clone()),
            amount: Set(record.amount),
            date: Set(record.date),
            category_id: Set(record.category_id),
            is_fixed: Set(record.is_fixed),
        };
        active_model
            .update(self.conn)
            .await
            .map_err(|e| Error::write("expense", record.id, e))?;
        Ok(())
    }

    async fn delete_expense(&self, dashboard_id: &str, id: i64) -> Result<bool> {
        let result = Expense::delete_many()
            .filter(expense::Column::Id.eq(id))
            .filter(expense::Column::DashboardId.eq(dashboard_id))
            .exec(self.conn)
            .await
            .map_err(|e| Error::write("expense", id, e))?;
        Ok(result.rows_affected > 0)
    }

    async fn get_incomes(&self, dashboard_id: &str) -> Result<Vec<income::Model>> {
        Income::find()
            .filter(income::Column::DashboardId.eq(dashboard_id))
            .order_by_asc(income::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    async fn add_income(&self, record: &income::Model) -> Result<income::Model> {
        let active_model = income::ActiveModel {
            dashboard_id: Set(record.dashboard_id.clone()),
            title: Set(record.title.clone()),
            amount: Set(record.amount),
            date: Set(record.date),
            is_fixed: Set(record.is_fixed),
            ..Default::default()
        };
        active_model.insert(self.conn).await.map_err(Into::into)
    }

    async fn update_income(&self, record: &income::Model) -> Result<()> {
        let active_model = income::ActiveModel {
            id: Unchanged(record.id),
            dashboard_id: Set(record.dashboard_id.clone()),
            title: Set(record.title.clone()),
            amount: Set(record.amount),
            date: Set(record.date),
            is_fixed: Set(record.is_fixed),
        };
        active_model
            .update(self.conn)
            .await
            .map_err(|e| Error::write("income", record.id, e))?;
        Ok(())
    }

    async fn delete_income(&self, dashboard_id: &str, id: i64) -> Result<bool> {
        let result = Income::delete_many()
            .filter(income::Column::Id.eq(id))
            .filter(income::Column::DashboardId.eq(dashboard_id))
            .exec(self.conn)
            .await
            .map_err(|e| Error::write("income", id, e))?;
        Ok(result.rows_affected > 0)
    }

    async fn get_categories(&self, dashboard_id: &str) -> Result<Vec<category::Model>> {
        Category::find()
            .filter(category::Column::DashboardId.eq(dashboard_id))
            .order_by_asc(category::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    async fn update_category(&self, record: &category::Model) -> Result<()> {
        let active_model = category::ActiveModel {
            id: Unchanged(record.id),
            dashboard_id: Set(record.dashboard_id.clone()),
            name: Set(record.name.clone()),
            spent: Set(record.spent),
        };
        active_model
            .update(self.conn)
            .await
            .map_err(|e| Error::write("category", record.id, e))?;
        Ok(())
    }

    async fn get_transition_preferences(
        &self,
        dashboard_id: &str,
    ) -> Result<Option<Vec<TransitionPreference>>> {
        match self.get_state_value(&preferences_key(dashboard_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_transition_preferences(
        &self,
        dashboard_id: &str,
        preferences: &[TransitionPreference],
    ) -> Result<()> {
        let json = serde_json::to_string(preferences)?;
        self.set_state_value(&preferences_key(dashboard_id), &json)
            .await
    }

    async fn get_state_value(&self, key: &str) -> Result<Option<String>> {
        let state = SystemState::find()
            .filter(system_state::Column::Key.eq(key))
            .one(self.conn)
            .await?;
        Ok(state.map(|s| s.value))
    }

    async fn set_state_value(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().naive_utc();

        let existing = SystemState::find()
            .filter(system_state::Column::Key.eq(key))
            .one(self.conn)
            .await?;

        if let Some(state) = existing {
            let mut active_model: system_state::ActiveModel = state.into();
            active_model.value = Set(value.to_string());
            active_model.updated_at = Set(now);
            active_model.update(self.conn).await?;
        } else {
            let new_state = system_state::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                updated_at: Set(now),
                ..Default::default()
            };
            new_state.insert(self.conn).await?;
        }
        debug!("Set system state: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::envelope::TransitionKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_budgets_are_scoped_by_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        create_budget(&db, "home", "Groceries", 100.0, 10.0, 0.0).await?;
        create_budget(&db, "work", "Lunch", 50.0, 0.0, 0.0).await?;

        let store = SeaOrmStore::new(&db);
        let budgets = store.get_budgets("home").await?;
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].title, "Groceries");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_budget_is_a_write_error() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SeaOrmStore::new(&db);
        let ghost = budget::Model {
            id: 999,
            dashboard_id: "home".to_string(),
            title: "Ghost".to_string(),
            budget: 0.0,
            spent: 0.0,
            carried_over: 0.0,
        };

        let result = store.update_budget(&ghost).await;
        assert!(matches!(
            result,
            Err(Error::Write {
                entity: "budget",
                id: 999,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_expense_reports_whether_a_row_was_removed() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SeaOrmStore::new(&db);
        let expense = create_expense(&store, "home", "Coffee", 4.5, date(2024, 3, 2), false).await?;

        // Wrong dashboard does not touch the row
        assert!(!store.delete_expense("work", expense.id).await?);
        assert!(store.delete_expense("home", expense.id).await?);
        assert!(!store.delete_expense("home", expense.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_preferences_absent_until_saved() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SeaOrmStore::new(&db);

        assert!(store.get_transition_preferences("home").await?.is_none());

        store.save_transition_preferences("home", &[]).await?;
        assert_eq!(store.get_transition_preferences("home").await?, Some(vec![]));
        assert!(store.get_transition_preferences("work").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_preferences_replaces_previous_set() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SeaOrmStore::new(&db);

        let first = vec![
            TransitionPreference::new(1, TransitionKind::Carry),
            TransitionPreference::new(2, TransitionKind::Reset),
        ];
        store.save_transition_preferences("home", &first).await?;

        let second = vec![TransitionPreference {
            partial_amount: Some(12.5),
            ..TransitionPreference::new(3, TransitionKind::Partial)
        }];
        store.save_transition_preferences("home", &second).await?;

        let loaded = store.get_transition_preferences("home").await?.unwrap();
        assert_eq!(loaded, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_state_value_upsert() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SeaOrmStore::new(&db);

        store.set_state_value("k", "one").await?;
        store.set_state_value("k", "two").await?;
        assert_eq!(store.get_state_value("k").await?, Some("two".to_string()));

        let count = SystemState::find()
            .filter(system_state::Column::Key.eq("k"))
            .count(&db)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }
}
