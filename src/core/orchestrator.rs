//! Month transition orchestrator.
//!
//! Sequences validation, envelope processing, transaction roll-over and the
//! preference save, and turns whatever happens into one [`TransitionReport`].
//! A [`MonthTransition`] is consumed by [`MonthTransition::run`]; a retry builds a
//! fresh one. Nothing is retried automatically.

use crate::{
    config::settings::TransitionSettings,
    core::{
        envelope::BudgetEnvelope,
        period,
        preferences::{preferences_from_envelopes, save_preferences},
        processor::{TransitionPlan, process_envelopes},
        rollover::{RollOverSummary, roll_over_transactions},
        store::BudgetStore,
        validation::validate_envelopes,
    },
    errors::Error,
};
use chrono::NaiveDate;
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Where a transition currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStage {
    /// Constructed, not started
    Idle,
    /// Checking the user's choices
    Validating,
    /// Writing envelope balances
    Processing,
    /// Clearing and re-dating transactions
    RollingOver,
    /// Remembering the choices for next period
    SavingPreferences,
    /// Finished successfully
    Done,
    /// Stopped at the first hard failure
    Failed,
}

impl fmt::Display for TransitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Processing => "processing envelopes",
            Self::RollingOver => "rolling over transactions",
            Self::SavingPreferences => "saving preferences",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The step that failed and its error.
#[derive(Debug)]
pub struct TransitionFailure {
    /// Stage that was running when the error occurred
    pub stage: TransitionStage,
    /// Underlying error
    pub error: Error,
}

/// Everything the caller needs to show the outcome of a transition.
#[derive(Debug)]
pub struct TransitionReport {
    /// Dashboard that was transitioned
    pub dashboard_id: String,
    /// Date the transition ran for
    pub date: NaiveDate,
    /// Every stage entered, in order
    pub stages: Vec<TransitionStage>,
    /// Applied envelope plan, once processing succeeded
    pub plan: Option<TransitionPlan>,
    /// Roll-over counts, once the roll-over succeeded
    pub roll_over: Option<RollOverSummary>,
    /// Non-fatal problems (skipped envelopes, failed preference save)
    pub warnings: Vec<String>,
    /// Set when the transition ended in `Failed`
    pub failure: Option<TransitionFailure>,
}

impl TransitionReport {
    /// Whether the financial transition committed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The terminal stage.
    #[must_use]
    pub fn final_stage(&self) -> TransitionStage {
        self.stages.last().copied().unwrap_or(TransitionStage::Idle)
    }

    /// Short message suitable for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match &self.failure {
            None if self.warnings.is_empty() => "Month transition completed.".to_string(),
            None => format!(
                "Month transition completed with {} warning(s).",
                self.warnings.len()
            ),
            Some(TransitionFailure {
                error: Error::Validation { violations },
                ..
            }) => format!("Some transfers have no target: {}", violations.join("; ")),
            Some(TransitionFailure {
                error: Error::NoBudgets { .. },
                ..
            }) => "There are no budgets to transition.".to_string(),
            Some(TransitionFailure { stage, error }) => {
                format!("Transition failed while {stage}: {error}")
            }
        }
    }
}

type ProgressCallback<'a> = Box<dyn FnMut(TransitionStage) + 'a>;

/// One user-initiated month transition for one dashboard.
pub struct MonthTransition<'a, S> {
    store: &'a S,
    dashboard_id: String,
    settings: TransitionSettings,
    date: NaiveDate,
    stage: TransitionStage,
    history: Vec<TransitionStage>,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a, S> MonthTransition<'a, S>
where
    S: BudgetStore,
{
    /// Prepares a transition of `dashboard_id` dated `date`.
    pub fn new(
        store: &'a S,
        dashboard_id: impl Into<String>,
        settings: TransitionSettings,
        date: NaiveDate,
    ) -> Self {
        Self {
            store,
            dashboard_id: dashboard_id.into(),
            settings,
            date,
            stage: TransitionStage::Idle,
            history: vec![TransitionStage::Idle],
            progress: None,
        }
    }

    /// Calls `callback` on every stage change.
    #[must_use]
    pub fn on_progress(mut self, callback: impl FnMut(TransitionStage) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> TransitionStage {
        self.stage
    }

    fn enter(&mut self, stage: TransitionStage) {
        info!("Transition of '{}': {}", self.dashboard_id, stage);
        self.stage = stage;
        self.history.push(stage);
        if let Some(callback) = self.progress.as_mut() {
            callback(stage);
        }
    }

    /// Runs the transition to `Done` or to the first hard failure.
    ///
    /// A failed preference save or bookkeeping write after the roll-over is only
    /// a warning: the money has already moved by then.
    #[instrument(skip_all, fields(dashboard_id = %self.dashboard_id))]
    pub async fn run(mut self, envelopes: &[BudgetEnvelope]) -> TransitionReport {
        let mut report = TransitionReport {
            dashboard_id: self.dashboard_id.clone(),
            date: self.date,
            stages: Vec::new(),
            plan: None,
            roll_over: None,
            warnings: Vec::new(),
            failure: None,
        };

        self.enter(TransitionStage::Validating);
        if let Err(e) = validate_envelopes(envelopes) {
            return self.fail(report, e);
        }

        self.enter(TransitionStage::Processing);
        match process_envelopes(
            self.store,
            &self.dashboard_id,
            envelopes,
            self.settings.chunk_size,
        )
        .await
        {
            Ok(plan) => {
                report.warnings.extend(
                    plan.skipped
                        .iter()
                        .map(|s| format!("'{}' was left unchanged: {}", s.title, s.reason)),
                );
                report.plan = Some(plan);
            }
            Err(e) => return self.fail(report, e),
        }

        self.enter(TransitionStage::RollingOver);
        match roll_over_transactions(self.store, &self.dashboard_id, self.settings.chunk_size)
            .await
        {
            Ok(summary) => report.roll_over = Some(summary),
            Err(e) => return self.fail(report, e),
        }

        self.enter(TransitionStage::SavingPreferences);
        let preferences = preferences_from_envelopes(envelopes);
        if let Err(e) = save_preferences(self.store, &self.dashboard_id, &preferences).await {
            warn!("{}", e);
            report.warnings.push(e.to_string());
        }
        if let Err(e) = period::record_transition(self.store, &self.dashboard_id, self.date).await
        {
            warn!("Failed to record transition date: {}", e);
            report
                .warnings
                .push(format!("Failed to record transition date: {e}"));
        }

        self.enter(TransitionStage::Done);
        report.stages = self.history;
        report
    }

    fn fail(mut self, mut report: TransitionReport, error: Error) -> TransitionReport {
        let stage = self.stage;
        error!("Transition failed while {}: {}", stage, error);
        self.enter(TransitionStage::Failed);
        report.failure = Some(TransitionFailure { stage, error });
        report.stages = self.history;
        report
    }
}

/// Formats a transition report into a human-readable summary.
#[must_use]
pub fn format_transition_summary(report: &TransitionReport) -> String {
    let mut summary = format!(
        "Month Transition - {} - {} - {}\n",
        report.dashboard_id,
        report.date.format("%B %Y"),
        report.user_message()
    );

    if let Some(plan) = &report.plan {
        summary.push_str(&format!(
            "  Envelopes: {} applied | {} skipped | ${:.2} transferred\n\n",
            plan.results.len(),
            plan.skipped.len(),
            plan.total_transferred()
        ));
        for result in &plan.results {
            summary.push_str(&format!(
                "  {} - {} | ${:.2} → ${:.2} (out ${:.2})\n",
                result.title,
                result.kind.label(),
                result.old_remaining,
                result.new_carried_over,
                result.transferred_out
            ));
        }
    }

    if let Some(roll_over) = &report.roll_over {
        summary.push_str(&format!(
            "  Transactions: {} expenses and {} incomes deleted, {} expenses and {} incomes moved to next month, {} categories reset\n",
            roll_over.deleted_expenses,
            roll_over.deleted_incomes,
            roll_over.redated_expenses,
            roll_over.redated_incomes,
            roll_over.reset_categories
        ));
    }

    for warning in &report.warnings {
        summary.push_str(&format!("  Warning: {warning}\n"));
    }

    summary
}
