//! Envelope snapshot - the in-memory view of a period's budgets.
//!
//! [`build_envelopes`] turns raw budget records into [`BudgetEnvelope`]s and overlays
//! the transition choices saved at the end of the previous period.

use crate::{core::preferences::TransitionPreference, entities::budget};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Title shown for a transfer target whose id no longer resolves.
pub const UNKNOWN_TITLE: &str = "unknown";

/// The five transition policies, without their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    /// Drop the leftover balance
    #[default]
    Reset,
    /// Carry the full leftover balance
    Carry,
    /// Carry a chosen part of the leftover balance
    Partial,
    /// Move the leftover balance to one other envelope
    Transfer,
    /// Split the leftover balance across several envelopes
    MultiTransfer,
}

impl TransitionKind {
    /// Label used in summaries and violation messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Carry => "carry",
            Self::Partial => "partial",
            Self::Transfer => "transfer",
            Self::MultiTransfer => "multi-transfer",
        }
    }
}

/// One leg of a multi-transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTransfer {
    /// Destination envelope id
    pub target_id: i64,
    /// Destination title, `None` when the id no longer resolves
    pub target_title: Option<String>,
    /// Amount moved to the destination
    pub amount: f64,
}

/// A transition policy together with its parameters.
///
/// `Transfer` allows a missing target because envelopes are edited in place
/// before confirmation; the validator rejects such envelopes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransitionOption {
    /// `spent = 0, carried_over = 0`
    #[default]
    Reset,
    /// `spent = 0, carried_over = remaining`
    Carry,
    /// `spent = 0, carried_over = amount`
    Partial {
        /// Amount to carry forward
        amount: f64,
    },
    /// Source is emptied and `remaining` is added to the target's carry-over
    Transfer {
        /// Destination envelope id
        target_id: Option<i64>,
        /// Destination title, resolved for display
        target_title: Option<String>,
    },
    /// Each leg's amount is added to its target; the rest stays on the source
    MultiTransfer {
        /// Ordered transfer legs
        transfers: Vec<MultiTransfer>,
    },
}

impl TransitionOption {
    /// The policy without its parameters.
    #[must_use]
    pub const fn kind(&self) -> TransitionKind {
        match self {
            Self::Reset => TransitionKind::Reset,
            Self::Carry => TransitionKind::Carry,
            Self::Partial { .. } => TransitionKind::Partial,
            Self::Transfer { .. } => TransitionKind::Transfer,
            Self::MultiTransfer { .. } => TransitionKind::MultiTransfer,
        }
    }
}

/// Processing view of one budget for the period being closed.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetEnvelope {
    /// Same id as the underlying budget record
    pub id: i64,
    /// Display name
    pub title: String,
    /// Nominal allocation
    pub budget: f64,
    /// Amount consumed this period
    pub spent: f64,
    /// Amount brought forward from earlier periods
    pub carried_over: f64,
    /// Chosen transition policy
    pub option: TransitionOption,
}

impl BudgetEnvelope {
    /// Envelope for a budget record with the default `reset` policy.
    #[must_use]
    pub fn from_budget(record: &budget::Model) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            budget: record.budget,
            spent: record.spent,
            carried_over: record.carried_over,
            option: TransitionOption::Reset,
        }
    }

    /// `budget + carried_over - spent`; negative when overspent.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.budget + self.carried_over - self.spent
    }
}

/// Builds the envelope snapshot for a period.
///
/// Each budget becomes an envelope with the `reset` policy unless `preferences`
/// holds an entry for its id. Transfer targets are re-resolved by id against
/// `budgets`; a target that no longer exists keeps its id with no title. The
/// result depends only on the inputs, so calling it twice gives equal output.
#[must_use]
pub fn build_envelopes(
    budgets: &[budget::Model],
    preferences: Option<&[TransitionPreference]>,
) -> Vec<BudgetEnvelope> {
    let titles: HashMap<i64, &str> = budgets
        .iter()
        .map(|b| (b.id, b.title.as_str()))
        .collect();
    let saved: HashMap<i64, &TransitionPreference> = preferences
        .unwrap_or_default()
        .iter()
        .map(|p| (p.id, p))
        .collect();

    budgets
        .iter()
        .map(|record| {
            let mut envelope = BudgetEnvelope::from_budget(record);
            if let Some(preference) = saved.get(&record.id) {
                envelope.option = option_from_preference(preference, &titles);
            }
            envelope
        })
        .collect()
}

fn option_from_preference(
    preference: &TransitionPreference,
    titles: &HashMap<i64, &str>,
) -> TransitionOption {
    let resolve = |id: i64| titles.get(&id).map(|title| (*title).to_string());

    match preference.transition_option {
        TransitionKind::Reset => TransitionOption::Reset,
        TransitionKind::Carry => TransitionOption::Carry,
        TransitionKind::Partial => TransitionOption::Partial {
            amount: preference.partial_amount.unwrap_or(0.0),
        },
        TransitionKind::Transfer => TransitionOption::Transfer {
            target_id: preference.transfer_target_id,
            target_title: preference.transfer_target_id.and_then(resolve),
        },
        TransitionKind::MultiTransfer => TransitionOption::MultiTransfer {
            transfers: preference
                .multi_transfers
                .iter()
                .flatten()
                .map(|leg| MultiTransfer {
                    target_id: leg.target_id,
                    target_title: resolve(leg.target_id),
                    amount: leg.amount,
                })
                .collect(),
        },
    }
}

/// Title for display, falling back to [`UNKNOWN_TITLE`].
#[must_use]
pub fn display_title(title: Option<&str>) -> &str {
    title.unwrap_or(UNKNOWN_TITLE)
}
