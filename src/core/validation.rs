//! Transition validation - checks that every transfer choice is complete.
//!
//! Pure, no I/O. Amount bounds are not checked here; the processor re-checks them
//! before it writes anything.

use crate::{
    core::envelope::{BudgetEnvelope, TransitionOption},
    errors::{Error, Result},
};

/// Every incomplete transfer configuration, one message per offending envelope.
#[must_use]
pub fn find_violations(envelopes: &[BudgetEnvelope]) -> Vec<String> {
    envelopes
        .iter()
        .filter_map(|envelope| match &envelope.option {
            TransitionOption::Transfer {
                target_id: None, ..
            } => Some(format!(
                "'{}' is set to transfer but has no target envelope",
                envelope.title
            )),
            TransitionOption::MultiTransfer { transfers } if transfers.is_empty() => Some(
                format!(
                    "'{}' is set to multi-transfer but has no transfers",
                    envelope.title
                ),
            ),
            _ => None,
        })
        .collect()
}

/// Fails with every violation at once when any envelope is incomplete.
///
/// # Errors
/// Returns [`Error::Validation`] listing all violations.
pub fn validate_envelopes(envelopes: &[BudgetEnvelope]) -> Result<()> {
    let violations = find_violations(envelopes);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { violations })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::envelope::MultiTransfer;
    use crate::test_utils::budget_record;

    fn envelope(id: i64, option: TransitionOption) -> BudgetEnvelope {
        let mut envelope = BudgetEnvelope::from_budget(&budget_record(
            id,
            &format!("Envelope {id}"),
            100.0,
            0.0,
            0.0,
        ));
        envelope.option = option;
        envelope
    }

    #[test]
    fn test_complete_choices_are_valid() {
        let envelopes = vec![
            envelope(1, TransitionOption::Reset),
            envelope(2, TransitionOption::Carry),
            envelope(3, TransitionOption::Partial { amount: 10.0 }),
            envelope(
                4,
                TransitionOption::Transfer {
                    target_id: Some(1),
                    target_title: None,
                },
            ),
            envelope(
                5,
                TransitionOption::MultiTransfer {
                    transfers: vec![MultiTransfer {
                        target_id: 2,
                        target_title: None,
                        amount: 5.0,
                    }],
                },
            ),
        ];

        assert!(validate_envelopes(&envelopes).is_ok());
    }

    #[test]
    fn test_reports_every_violation() {
        let missing_target = || TransitionOption::Transfer {
            target_id: None,
            target_title: None,
        };
        let no_legs = || TransitionOption::MultiTransfer { transfers: vec![] };
        let envelopes = vec![
            envelope(1, missing_target()),
            envelope(2, TransitionOption::Carry),
            envelope(3, missing_target()),
            envelope(4, no_legs()),
            envelope(5, missing_target()),
            envelope(6, no_legs()),
        ];

        let violations = find_violations(&envelopes);
        assert_eq!(violations.len(), 5);
        assert!(violations[0].contains("Envelope 1"));
        assert!(violations[2].contains("Envelope 4"));
        assert!(violations[2].contains("multi-transfer"));
        assert!(violations[4].contains("Envelope 6"));

        let Err(Error::Validation { violations }) = validate_envelopes(&envelopes) else {
            unreachable!("validation must fail");
        };
        assert_eq!(violations.len(), 5);
    }

    #[test]
    fn test_amount_bounds_are_not_checked() {
        let envelopes = vec![envelope(1, TransitionOption::Partial { amount: 1_000.0 })];
        assert!(find_violations(&envelopes).is_empty());
    }
}
