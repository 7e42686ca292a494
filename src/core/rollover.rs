//! Transaction period roll-over.
//!
//! Runs only after the envelope transition committed: deletes every regular
//! expense and income of the dashboard, moves every fixed (recurring) one to the
//! same day of the next month, and zeroes each category's spend.

use crate::{
    core::{batch::write_in_chunks, store::BudgetStore},
    entities::{category, expense, income},
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate};
use tracing::{info, instrument, warn};

/// Counts of what a roll-over changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollOverSummary {
    /// Regular expenses deleted
    pub deleted_expenses: usize,
    /// Regular incomes deleted
    pub deleted_incomes: usize,
    /// Fixed expenses moved to next month
    pub redated_expenses: usize,
    /// Fixed incomes moved to next month
    pub redated_incomes: usize,
    /// Categories whose spend was reset
    pub reset_categories: usize,
}

/// Same day of the following month, clamped to the month's last day
/// (Jan 31 becomes Feb 28 or Feb 29).
#[must_use]
pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(1))
}

fn redated(id: i64, date: NaiveDate, entity: &'static str) -> Result<NaiveDate> {
    next_month(date).ok_or_else(|| Error::write(entity, id, format!("cannot advance {date}")))
}

/// Rolls the dashboard's transactions and categories over into the next period.
///
/// # Errors
/// Returns the first failing read or write; records handled by earlier chunks
/// stay changed.
#[instrument(skip(store))]
pub async fn roll_over_transactions<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    chunk_size: usize,
) -> Result<RollOverSummary> {
    let expenses = store.get_expenses(dashboard_id).await?;
    let incomes = store.get_incomes(dashboard_id).await?;
    let categories = store.get_categories(dashboard_id).await?;

    let (fixed_expenses, regular_expenses): (Vec<_>, Vec<_>) =
        expenses.into_iter().partition(|e| e.is_fixed);
    let (fixed_incomes, regular_incomes): (Vec<_>, Vec<_>) =
        incomes.into_iter().partition(|i| i.is_fixed);

    let deleted_expenses = write_in_chunks(&regular_expenses, chunk_size, |e| async move {
        if !store.delete_expense(dashboard_id, e.id).await? {
            warn!("Expense {} was already gone", e.id);
        }
        Ok(())
    })
    .await?;

    let deleted_incomes = write_in_chunks(&regular_incomes, chunk_size, |i| async move {
        if !store.delete_income(dashboard_id, i.id).await? {
            warn!("Income {} was already gone", i.id);
        }
        Ok(())
    })
    .await?;

    let moved_expenses = fixed_expenses
        .into_iter()
        .map(|e| -> Result<expense::Model> {
            Ok(expense::Model {
                date: redated(e.id, e.date, "expense")?,
                ..e
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let redated_expenses =
        write_in_chunks(&moved_expenses, chunk_size, |e| store.update_expense(e)).await?;

    let moved_incomes = fixed_incomes
        .into_iter()
        .map(|i| -> Result<income::Model> {
            Ok(income::Model {
                date: redated(i.id, i.date, "income")?,
                ..i
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let redated_incomes =
        write_in_chunks(&moved_incomes, chunk_size, |i| store.update_income(i)).await?;

    let cleared: Vec<category::Model> = categories
        .into_iter()
        .map(|c| category::Model { spent: 0.0, ..c })
        .collect();
    let reset_categories =
        write_in_chunks(&cleared, chunk_size, |c| store.update_category(c)).await?;

    let summary = RollOverSummary {
        deleted_expenses,
        deleted_incomes,
        redated_expenses,
        redated_incomes,
        reset_categories,
    };
    info!(
        "Rolled over: deleted {} expenses / {} incomes, moved {} expenses / {} incomes, reset {} categories",
        summary.deleted_expenses,
        summary.deleted_incomes,
        summary.redated_expenses,
        summary.redated_incomes,
        summary.reset_categories
    );
    Ok(summary)
}
