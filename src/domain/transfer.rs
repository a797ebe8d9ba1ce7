use super::money::Amount;
use super::payment::PaymentId;
use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TransferId = u64;

/// An incoming bank transfer as reported by the bank feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransfer {
    pub id: TransferId,
    pub from_account: String,
    pub sender_name: String,
    pub title: String,
    pub amount: Amount,
    pub received_at: DateTime<Utc>,
    /// Set once, when the transfer is matched to the payment it explains.
    pub matched_payment_id: Option<PaymentId>,
}

impl BankTransfer {
    pub fn is_matched(&self) -> bool {
        self.matched_payment_id.is_some()
    }

    /// Records the match. A transfer is matched at most once, ever.
    pub fn mark_matched(&mut self, payment_id: PaymentId) -> Result<()> {
        match self.matched_payment_id {
            Some(existing) => Err(BillingError::InvariantViolation(format!(
                "transfer {} is already matched to payment {existing}",
                self.id
            ))),
            None => {
                self.matched_payment_id = Some(payment_id);
                Ok(())
            }
        }
    }
}

/// A transfer reported by the bank feed, before it is recorded.
///
/// `received_at` is taken from the feed when it carries one; otherwise the
/// ingestion clock stamps the transfer at the moment it is recorded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingTransfer {
    pub from_account: String,
    pub sender_name: String,
    pub title: String,
    pub amount: Amount,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl IncomingTransfer {
    pub fn new(
        from_account: impl Into<String>,
        sender_name: impl Into<String>,
        title: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            from_account: from_account.into(),
            sender_name: sender_name.into(),
            title: title.into(),
            amount,
            received_at: None,
        }
    }

    pub fn into_transfer(self, id: TransferId, now: DateTime<Utc>) -> BankTransfer {
        BankTransfer {
            id,
            from_account: self.from_account,
            sender_name: self.sender_name,
            title: self.title,
            amount: self.amount,
            received_at: self.received_at.unwrap_or(now),
            matched_payment_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_match_is_monotonic() {
        let incoming =
            IncomingTransfer::new("111", "Jan", "stay 4", Amount::new(dec!(10)).unwrap());
        let mut transfer = incoming.into_transfer(1, Utc::now());
        transfer.mark_matched(4).unwrap();
        assert!(transfer.mark_matched(5).is_err());
        assert_eq!(transfer.matched_payment_id, Some(4));
    }

    #[test]
    fn test_clock_stamps_transfers_without_feed_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 30, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 7, 31, 18, 0, 0).unwrap();

        let stamped = IncomingTransfer::new("1", "A", "1", Amount::new(dec!(1)).unwrap())
            .into_transfer(1, now);
        assert_eq!(stamped.received_at, now);

        let mut from_feed = IncomingTransfer::new("1", "A", "1", Amount::new(dec!(1)).unwrap());
        from_feed.received_at = Some(earlier);
        assert_eq!(from_feed.into_transfer(2, now).received_at, earlier);
    }
}
