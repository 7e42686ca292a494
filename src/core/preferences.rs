//! Transition preferences - the per-envelope choices remembered for next period.
//!
//! A preference set is always saved wholesale and read once when the next
//! period's snapshot is built. Target titles are never stored; they are resolved
//! again at load time because titles can change.

use crate::{
    core::{
        envelope::{BudgetEnvelope, TransitionKind, TransitionOption},
        store::BudgetStore,
    },
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// One saved multi-transfer leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceTransfer {
    /// Destination envelope id
    pub target_id: i64,
    /// Amount moved to the destination
    pub amount: f64,
}

/// The remembered transition choice of one envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPreference {
    /// Envelope (budget) id
    pub id: i64,
    /// Chosen policy
    pub transition_option: TransitionKind,
    /// Only for `partial`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_amount: Option<f64>,
    /// Only for `transfer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_target_id: Option<i64>,
    /// Only for `multi-transfer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_transfers: Option<Vec<PreferenceTransfer>>,
}

impl TransitionPreference {
    /// Preference with no option parameters.
    #[must_use]
    pub const fn new(id: i64, transition_option: TransitionKind) -> Self {
        Self {
            id,
            transition_option,
            partial_amount: None,
            transfer_target_id: None,
            multi_transfers: None,
        }
    }
}

impl From<&BudgetEnvelope> for TransitionPreference {
    fn from(envelope: &BudgetEnvelope) -> Self {
        let mut preference = Self::new(envelope.id, envelope.option.kind());
        match &envelope.option {
            TransitionOption::Reset | TransitionOption::Carry => {}
            TransitionOption::Partial { amount } => preference.partial_amount = Some(*amount),
            TransitionOption::Transfer { target_id, .. } => {
                preference.transfer_target_id = *target_id;
            }
            TransitionOption::MultiTransfer { transfers } => {
                preference.multi_transfers = Some(
                    transfers
                        .iter()
                        .map(|leg| PreferenceTransfer {
                            target_id: leg.target_id,
                            amount: leg.amount,
                        })
                        .collect(),
                );
            }
        }
        preference
    }
}

/// The preference set to remember for a confirmed list of envelopes.
#[must_use]
pub fn preferences_from_envelopes(envelopes: &[BudgetEnvelope]) -> Vec<TransitionPreference> {
    envelopes.iter().map(TransitionPreference::from).collect()
}

/// Replaces the dashboard's stored preferences with `preferences`.
///
/// # Errors
/// Any persistence failure is reported as [`Error::PreferenceSave`]; the caller
/// must not assume the old set is still intact or that the new one was stored.
#[instrument(skip(store, preferences), fields(count = preferences.len()))]
pub async fn save_preferences<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    preferences: &[TransitionPreference],
) -> Result<()> {
    store
        .save_transition_preferences(dashboard_id, preferences)
        .await
        .map_err(|e| Error::PreferenceSave {
            message: e.to_string(),
        })?;
    info!("Saved {} transition preferences", preferences.len());
    Ok(())
}

/// Loads the dashboard's stored preferences; `None` if nothing was ever saved.
pub async fn load_preferences<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
) -> Result<Option<Vec<TransitionPreference>>> {
    store.get_transition_preferences(dashboard_id).await
}
