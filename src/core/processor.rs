//! Envelope transition processor.
//!
//! Computes the new `spent`/`carried_over` of every source envelope and every
//! transfer target, then writes the resulting budget records in chunks. All
//! targets are read from one snapshot taken before any write, so two sources
//! sending money to the same target never double count.

use crate::{
    core::{
        batch::write_in_chunks,
        envelope::{BudgetEnvelope, TransitionKind, TransitionOption},
        store::BudgetStore,
    },
    entities::budget,
    errors::{Error, Result},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

/// Tolerance for comparing money amounts.
pub const AMOUNT_EPSILON: f64 = 1e-9;

/// What happened to one source envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeResult {
    /// Envelope id
    pub id: i64,
    /// Envelope title
    pub title: String,
    /// Applied policy
    pub kind: TransitionKind,
    /// `remaining` before the transition
    pub old_remaining: f64,
    /// Carry-over kept on the envelope itself, before incoming transfers
    pub new_carried_over: f64,
    /// Total moved to other envelopes
    pub transferred_out: f64,
}

/// A source envelope that was left untouched, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEnvelope {
    /// Envelope id
    pub id: i64,
    /// Envelope title
    pub title: String,
    /// Human-readable reason
    pub reason: String,
}

/// The computed outcome of a transition batch, before or after it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    /// Dashboard being transitioned
    pub dashboard_id: String,
    /// Full replacement records, at most one per budget id, ordered by id
    pub updates: Vec<budget::Model>,
    /// One entry per applied source envelope, in input order
    pub results: Vec<EnvelopeResult>,
    /// Source envelopes that were not applied
    pub skipped: Vec<SkippedEnvelope>,
}

impl TransitionPlan {
    /// Sum of all amounts moved between envelopes.
    #[must_use]
    pub fn total_transferred(&self) -> f64 {
        self.results.iter().map(|r| r.transferred_out).sum()
    }

    /// Balance dropped by `reset`.
    #[must_use]
    pub fn total_reset(&self) -> f64 {
        self.results
            .iter()
            .filter(|r| r.kind == TransitionKind::Reset)
            .map(|r| r.old_remaining)
            .sum()
    }

    /// Whether the plan writes the given budget id.
    #[must_use]
    pub fn updates_budget(&self, id: i64) -> bool {
        self.updates.iter().any(|record| record.id == id)
    }
}

struct Decision {
    carried_over: f64,
    outgoing: Vec<(i64, f64)>,
}

/// Computes the writes for a batch of envelopes without touching storage.
///
/// `budgets` is the full lookup of the period's budget records; it is the
/// snapshot every source and target is read from, and the authority for each
/// envelope's `remaining`.
///
/// # Errors
/// Returns [`Error::NoBudgets`] if `budgets` is empty.
pub fn plan_transition(
    dashboard_id: &str,
    envelopes: &[BudgetEnvelope],
    budgets: &[budget::Model],
) -> Result<TransitionPlan> {
    if budgets.is_empty() {
        return Err(Error::NoBudgets {
            dashboard_id: dashboard_id.to_string(),
        });
    }

    let snapshot: HashMap<i64, &budget::Model> = budgets.iter().map(|b| (b.id, b)).collect();
    let mut sources: BTreeMap<i64, f64> = BTreeMap::new();
    let mut incoming: BTreeMap<i64, f64> = BTreeMap::new();
    let mut seen = BTreeSet::new();
    let mut results = Vec::new();
    let mut skipped = Vec::new();

    for envelope in envelopes {
        let outcome = if seen.insert(envelope.id) {
            snapshot
                .get(&envelope.id)
                .ok_or_else(|| "no budget record exists for this envelope".to_string())
                .and_then(|record| {
                    let remaining = record.remaining();
                    decide(envelope, remaining, &snapshot).map(|d| (remaining, d))
                })
        } else {
            Err("envelope is listed more than once".to_string())
        };

        match outcome {
            Ok((remaining, decision)) => {
                let transferred_out: f64 = decision.outgoing.iter().map(|(_, amount)| amount).sum();
                debug!(
                    "Envelope {} '{}': {} | remaining {:.2} -> carried over {:.2}, out {:.2}",
                    envelope.id,
                    envelope.title,
                    envelope.option.kind().label(),
                    remaining,
                    decision.carried_over,
                    transferred_out
                );
                for (target_id, amount) in &decision.outgoing {
                    *incoming.entry(*target_id).or_default() += amount;
                }
                sources.insert(envelope.id, decision.carried_over);
                results.push(EnvelopeResult {
                    id: envelope.id,
                    title: envelope.title.clone(),
                    kind: envelope.option.kind(),
                    old_remaining: remaining,
                    new_carried_over: decision.carried_over,
                    transferred_out,
                });
            }
            Err(reason) => {
                warn!(
                    "Skipping envelope {} '{}': {}",
                    envelope.id, envelope.title, reason
                );
                skipped.push(SkippedEnvelope {
                    id: envelope.id,
                    title: envelope.title.clone(),
                    reason,
                });
            }
        }
    }

    let touched: BTreeSet<i64> = sources.keys().chain(incoming.keys()).copied().collect();
    let updates = touched
        .into_iter()
        .filter_map(|id| snapshot.get(&id).map(|record| (*record).clone()))
        .map(|mut record| {
            if let Some(carried_over) = sources.get(&record.id) {
                record.spent = 0.0;
                record.carried_over = *carried_over;
            }
            if let Some(delta) = incoming.get(&record.id) {
                record.carried_over += delta;
            }
            record
        })
        .collect();

    Ok(TransitionPlan {
        dashboard_id: dashboard_id.to_string(),
        updates,
        results,
        skipped,
    })
}

fn decide(
    envelope: &BudgetEnvelope,
    remaining: f64,
    snapshot: &HashMap<i64, &budget::Model>,
) -> std::result::Result<Decision, String> {
    let check_target = |target_id: i64| {
        if target_id == envelope.id {
            Err("an envelope cannot transfer to itself".to_string())
        } else if snapshot.contains_key(&target_id) {
            Ok(())
        } else {
            Err(format!("transfer target {target_id} does not exist"))
        }
    };

    match &envelope.option {
        TransitionOption::Reset => Ok(Decision {
            carried_over: 0.0,
            outgoing: Vec::new(),
        }),
        TransitionOption::Carry => Ok(Decision {
            carried_over: remaining,
            outgoing: Vec::new(),
        }),
        TransitionOption::Partial { amount } => {
            let upper = remaining.max(0.0);
            if !amount.is_finite() || *amount < 0.0 || *amount > upper + AMOUNT_EPSILON {
                return Err(format!(
                    "partial amount {amount:.2} is outside 0.00..={upper:.2}"
                ));
            }
            Ok(Decision {
                carried_over: *amount,
                outgoing: Vec::new(),
            })
        }
        TransitionOption::Transfer { target_id, .. } => {
            let target_id = target_id.ok_or_else(|| "no transfer target".to_string())?;
            check_target(target_id)?;
            Ok(Decision {
                carried_over: 0.0,
                outgoing: vec![(target_id, remaining)],
            })
        }
        TransitionOption::MultiTransfer { transfers } => {
            if transfers.is_empty() {
                return Err("multi-transfer has no transfers".to_string());
            }
            for leg in transfers {
                if !leg.amount.is_finite() {
                    return Err(format!(
                        "transfer amount {} is not a finite number",
                        leg.amount
                    ));
                }
                if leg.amount < 0.0 {
                    return Err(format!("transfer amount {:.2} is negative", leg.amount));
                }
                check_target(leg.target_id)?;
            }
            let total: f64 = transfers.iter().map(|leg| leg.amount).sum();
            if total > remaining + AMOUNT_EPSILON {
                return Err(format!(
                    "transfers total {total:.2} exceeds remaining {remaining:.2}"
                ));
            }
            Ok(Decision {
                carried_over: remaining - total,
                outgoing: transfers
                    .iter()
                    .map(|leg| (leg.target_id, leg.amount))
                    .collect(),
            })
        }
    }
}

/// Writes a plan's updates through the store, `chunk_size` at a time.
///
/// # Errors
/// Returns the first failed write; earlier chunks stay applied.
#[instrument(skip(store, plan), fields(dashboard_id = %plan.dashboard_id, updates = plan.updates.len()))]
pub async fn apply_plan<S: BudgetStore>(
    store: &S,
    plan: &TransitionPlan,
    chunk_size: usize,
) -> Result<usize> {
    write_in_chunks(&plan.updates, chunk_size, |record| store.update_budget(record)).await
}

/// Loads the dashboard's budgets, plans the transition and writes it.
///
/// # Errors
/// Returns [`Error::NoBudgets`] when the dashboard has no budgets, or the first
/// failing read or write.
#[instrument(skip(store, envelopes), fields(envelopes = envelopes.len()))]
pub async fn process_envelopes<S: BudgetStore>(
    store: &S,
    dashboard_id: &str,
    envelopes: &[BudgetEnvelope],
    chunk_size: usize,
) -> Result<TransitionPlan> {
    let budgets = store.get_budgets(dashboard_id).await?;
    let plan = plan_transition(dashboard_id, envelopes, &budgets)?;
    let written = apply_plan(store, &plan, chunk_size).await?;
    info!(
        "Transitioned {} envelopes ({} skipped), wrote {} budgets",
        plan.results.len(),
        plan.skipped.len(),
        written
    );
    Ok(plan)
}
