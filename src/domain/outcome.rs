use super::money::Money;
use super::payment::PaymentId;
use super::stay::StayId;
use super::transfer::TransferId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Terminal classification of one matching attempt.
///
/// These are not errors: every transfer ends in exactly one of them and the
/// reconciliation pass moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The transfer covered what was left and the payment is now paid.
    Matched { stay_id: StayId, payment_id: PaymentId },
    /// The transfer explains the payment but does not clear it.
    PartiallyMatched {
        stay_id: StayId,
        payment_id: PaymentId,
        outstanding: Money,
        overdue_days: u32,
    },
    /// No stay reference could be read from the title.
    Unparseable,
    StayNotFound { stay_id: StayId },
    /// The sender account is not the one registered for the stay's owner.
    AccountMismatch { stay_id: StayId },
    PaymentNotFound { stay_id: StayId },
    /// The payment was already paid; the transfer is kept but not consumed.
    AlreadySettled { stay_id: StayId, payment_id: PaymentId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Matched,
    PartiallyMatched,
    Unparseable,
    StayNotFound,
    AccountMismatch,
    PaymentNotFound,
    AlreadySettled,
}

impl MatchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Matched { .. } => OutcomeKind::Matched,
            Self::PartiallyMatched { .. } => OutcomeKind::PartiallyMatched,
            Self::Unparseable => OutcomeKind::Unparseable,
            Self::StayNotFound { .. } => OutcomeKind::StayNotFound,
            Self::AccountMismatch { .. } => OutcomeKind::AccountMismatch,
            Self::PaymentNotFound { .. } => OutcomeKind::PaymentNotFound,
            Self::AlreadySettled { .. } => OutcomeKind::AlreadySettled,
        }
    }

    /// Whether the transfer was attached to a payment.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. } | Self::PartiallyMatched { .. })
    }
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::PartiallyMatched => "partially_matched",
            Self::Unparseable => "unparseable",
            Self::StayNotFound => "stay_not_found",
            Self::AccountMismatch => "account_mismatch",
            Self::PaymentNotFound => "payment_not_found",
            Self::AlreadySettled => "already_settled",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the observability sink receives for each processed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEvent {
    pub transfer_id: TransferId,
    pub outcome: MatchOutcome,
    pub at: DateTime<Utc>,
}
