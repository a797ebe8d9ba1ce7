//! Deciding which payment, if any, a bank transfer pays for.

use crate::domain::outcome::MatchOutcome;
use crate::domain::payment::{Payment, PaymentStatus, overdue_days};
use crate::domain::ports::Ledger;
use crate::domain::rate::calculate_amount;
use crate::domain::title::parse_stay_reference;
use crate::domain::transfer::BankTransfer;
use crate::error::{BillingError, Result};
use chrono::NaiveDate;

/// The matcher's verdict on one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPlan {
    pub outcome: MatchOutcome,
    /// Rows to commit together when the transfer was matched.
    pub commit: Option<(BankTransfer, Payment)>,
}

impl MatchPlan {
    fn unmatched(outcome: MatchOutcome) -> Self {
        Self {
            outcome,
            commit: None,
        }
    }
}

/// Classifies `transfer` and, for a match, computes the updated transfer and payment.
///
/// Nothing is written here; the caller commits `MatchPlan::commit` atomically.
/// The sender account must be the one registered for the stay's owner, and the
/// amount owed is recomputed from the stored stay rather than taken from the
/// payment row. The verdict depends only on the transfer's immutable fields
/// and the ledger state, so repeating it for an unmatched transfer is harmless.
pub async fn match_transfer(
    ledger: &dyn Ledger,
    transfer: &BankTransfer,
    today: NaiveDate,
) -> Result<MatchPlan> {
    if let Some(payment_id) = transfer.matched_payment_id {
        return Err(BillingError::InvariantViolation(format!(
            "transfer {} is already matched to payment {payment_id}",
            transfer.id
        )));
    }

    let Some(stay_id) = parse_stay_reference(&transfer.title) else {
        return Ok(MatchPlan::unmatched(MatchOutcome::Unparseable));
    };
    let Some(stay) = ledger.get_stay(stay_id).await? else {
        return Ok(MatchPlan::unmatched(MatchOutcome::StayNotFound { stay_id }));
    };

    let owner = ledger.get_owner(stay.owner_id).await?;
    if !owner.is_some_and(|owner| owner.owns_account(&transfer.from_account)) {
        return Ok(MatchPlan::unmatched(MatchOutcome::AccountMismatch { stay_id }));
    }

    let Some(mut payment) = ledger.payment_for_stay(stay_id).await? else {
        return Ok(MatchPlan::unmatched(MatchOutcome::PaymentNotFound { stay_id }));
    };
    if payment.is_settled() {
        return Ok(MatchPlan::unmatched(MatchOutcome::AlreadySettled {
            stay_id,
            payment_id: payment.id,
        }));
    }

    let required = calculate_amount(&stay)?;
    let status = payment.apply_transfer(
        transfer.amount.into(),
        required,
        overdue_days(today, stay.end_date),
    )?;
    let mut matched = transfer.clone();
    matched.mark_matched(payment.id)?;

    let outcome = match status {
        PaymentStatus::Paid => MatchOutcome::Matched {
            stay_id,
            payment_id: payment.id,
        },
        PaymentStatus::PartiallyPaidOverdue | PaymentStatus::Unpaid => {
            MatchOutcome::PartiallyMatched {
                stay_id,
                payment_id: payment.id,
                outstanding: payment.outstanding(),
                overdue_days: payment.overdue_days,
            }
        }
    };
    Ok(MatchPlan {
        outcome,
        commit: Some((matched, payment)),
    })
}
