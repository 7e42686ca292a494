//! Transition bookkeeping.
//!
//! Records the date of each dashboard's last completed transition so a runner can
//! tell whether the current month was already closed.

use crate::{
    core::store::BudgetStore,
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};

const LAST_TRANSITION_KEY_PREFIX: &str = "last_transition:";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn last_transition_key(dashboard_id: &str) -> String {
    format!("{LAST_TRANSITION_KEY_PREFIX}{dashboard_id}")
}

/// Date of the dashboard's last completed transition, if any.
///
/// # Errors
/// Returns [`Error::Config`] if the stored value is not a `YYYY-MM-DD` date.
pub async fn get_last_transition_date<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
) -> Result<Option<NaiveDate>> {
    store
        .get_state_value(&last_transition_key(dashboard_id))
        .await?
        .map(|value| {
            NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| Error::Config {
                message: format!("Failed to parse last transition date: {e}"),
            })
        })
        .transpose()
}

/// Stores `date` as the dashboard's last completed transition.
pub async fn record_transition<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    date: NaiveDate,
) -> Result<()> {
    store
        .set_state_value(
            &last_transition_key(dashboard_id),
            &date.format(DATE_FORMAT).to_string(),
        )
        .await
}

/// Whether the month containing `today` has not been transitioned yet.
pub async fn is_transition_due<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    today: NaiveDate,
) -> Result<bool> {
    let last = get_last_transition_date(store, dashboard_id).await?;
    Ok(last.is_none_or(|last| last.year() != today.year() || last.month() != today.month()))
}
