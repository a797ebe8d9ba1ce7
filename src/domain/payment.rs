use super::money::Money;
use super::stay::StayId;
use crate::error::{BillingError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type PaymentId = u64;

/// Settlement state of a payment, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaidOverdue,
    Paid,
}

/// The single billing record attached to a stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub stay_id: StayId,
    /// Amount owed, as last computed by the rate model.
    pub amount: Money,
    /// Sum of every matched transfer so far.
    pub amount_received: Money,
    pub is_paid: bool,
    pub is_overdue: bool,
    pub overdue_days: u32,
}

impl Payment {
    pub fn new(id: PaymentId, stay_id: StayId, amount: Money) -> Self {
        Self {
            id,
            stay_id,
            amount,
            amount_received: Money::ZERO,
            is_paid: false,
            is_overdue: false,
            overdue_days: 0,
        }
    }

    pub fn status(&self) -> PaymentStatus {
        if self.is_paid {
            PaymentStatus::Paid
        } else if self.is_overdue {
            PaymentStatus::PartiallyPaidOverdue
        } else {
            PaymentStatus::Unpaid
        }
    }

    pub fn is_settled(&self) -> bool {
        self.is_paid
    }

    pub fn outstanding(&self) -> Money {
        self.amount.saturating_sub(self.amount_received)
    }

    /// Credits a matched transfer against `required`, the freshly computed amount owed.
    ///
    /// Moves to `Paid` once the cumulative amount received covers `required`,
    /// otherwise to `PartiallyPaidOverdue` with `overdue_days`. Fails on a paid
    /// payment, which must never absorb further transfers, and when the running
    /// total would leave the range of `Decimal`. A failed call leaves the payment untouched.
    pub fn apply_transfer(
        &mut self,
        received: Money,
        required: Money,
        overdue_days: u32,
    ) -> Result<PaymentStatus> {
        if self.is_paid {
            return Err(BillingError::InvariantViolation(format!(
                "payment {} is already settled",
                self.id
            )));
        }
        let total = self.amount_received.checked_add(received).ok_or_else(|| {
            BillingError::ValidationError(format!(
                "payment {} cannot absorb {received} more: received total out of range",
                self.id
            ))
        })?;
        self.amount = required;
        self.amount_received = total;
        if self.amount_received >= required {
            self.mark_paid();
        } else {
            self.is_overdue = true;
            self.overdue_days = overdue_days;
        }
        Ok(self.status())
    }

    /// Replaces the amount owed after the stay's billing inputs changed.
    ///
    /// Settled payments keep their historical amount. Returns whether anything changed.
    pub fn reprice(&mut self, amount: Money) -> bool {
        if self.is_paid || self.amount == amount {
            return false;
        }
        self.amount = amount;
        if self.amount_received > Money::ZERO && self.amount_received >= amount {
            self.mark_paid();
        }
        true
    }

    /// Manual settlement. Returns `false` when the payment was already paid.
    pub fn settle(&mut self) -> bool {
        if self.is_paid {
            return false;
        }
        self.mark_paid();
        true
    }

    /// Re-derives `overdue_days` for a partially paid payment. Returns whether it changed.
    pub fn refresh_overdue(&mut self, today: NaiveDate, stay_end: NaiveDate) -> bool {
        if self.status() != PaymentStatus::PartiallyPaidOverdue {
            return false;
        }
        let days = overdue_days(today, stay_end);
        if days == self.overdue_days {
            return false;
        }
        self.overdue_days = days;
        true
    }

    fn mark_paid(&mut self) {
        self.is_paid = true;
        self.is_overdue = false;
        self.overdue_days = 0;
    }
}

/// Whole days elapsed since the stay ended, never negative.
pub fn overdue_days(today: NaiveDate, stay_end: NaiveDate) -> u32 {
    u32::try_from((today - stay_end).num_days()).unwrap_or(0)
}
