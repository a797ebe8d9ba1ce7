use crate::domain::directory::{Dog, DogId, Owner, OwnerId};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{
    DirectoryStore, Ledger, PaymentStore, Sequence, StayStore, TransferStore,
};
use crate::domain::stay::{DateRange, Stay, StayId};
use crate::domain::transfer::{BankTransfer, TransferId};
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    owners: BTreeMap<OwnerId, Owner>,
    dogs: BTreeMap<DogId, Dog>,
    stays: BTreeMap<StayId, Stay>,
    payments: BTreeMap<PaymentId, Payment>,
    payment_by_stay: BTreeMap<StayId, PaymentId>,
    transfers: BTreeMap<TransferId, BankTransfer>,
    next_stay: u64,
    next_payment: u64,
    next_transfer: u64,
}

impl Tables {
    fn ensure_transfer_unmatched(&self, id: TransferId) -> Result<()> {
        match self.transfers.get(&id) {
            Some(stored) if stored.is_matched() => Err(BillingError::InvariantViolation(format!(
                "transfer {id} is already matched"
            ))),
            Some(_) => Ok(()),
            None => Err(BillingError::not_found("transfer", id)),
        }
    }
}

/// A thread-safe in-memory ledger.
///
/// All tables sit behind a single `Arc<RwLock<..>>`, so every compound commit
/// happens under one write guard and is observed all-or-nothing by readers.
/// Ideal for tests and one-shot CLI runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryLedger {
    async fn store_owner(&self, owner: Owner) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.owners.insert(owner.id, owner);
        Ok(())
    }

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>> {
        let tables = self.tables.read().await;
        Ok(tables.owners.get(&id).cloned())
    }

    async fn store_dog(&self, dog: Dog) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.dogs.insert(dog.id, dog);
        Ok(())
    }

    async fn get_dog(&self, id: DogId) -> Result<Option<Dog>> {
        let tables = self.tables.read().await;
        Ok(tables.dogs.get(&id).cloned())
    }
}

#[async_trait]
impl StayStore for InMemoryLedger {
    async fn get_stay(&self, id: StayId) -> Result<Option<Stay>> {
        let tables = self.tables.read().await;
        Ok(tables.stays.get(&id).cloned())
    }

    async fn stays_for_dog(&self, dog_id: DogId, range: DateRange) -> Result<Vec<Stay>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stays
            .values()
            .filter(|stay| stay.dog_id == dog_id && stay.overlaps(&range))
            .cloned()
            .collect())
    }

    async fn all_stays(&self) -> Result<Vec<Stay>> {
        let tables = self.tables.read().await;
        Ok(tables.stays.values().cloned().collect())
    }
}

#[async_trait]
impl PaymentStore for InMemoryLedger {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).cloned())
    }

    async fn payment_for_stay(&self, stay_id: StayId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payment_by_stay
            .get(&stay_id)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.values().cloned().collect())
    }

    async fn update_payment(&self, payment: Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.payments.contains_key(&payment.id) {
            return Err(BillingError::not_found("payment", payment.id));
        }
        tables.payments.insert(payment.id, payment);
        Ok(())
    }
}

#[async_trait]
impl TransferStore for InMemoryLedger {
    async fn append_transfer(&self, transfer: BankTransfer) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.transfers.contains_key(&transfer.id) {
            return Err(BillingError::InvariantViolation(format!(
                "transfer {} already recorded",
                transfer.id
            )));
        }
        tables.transfers.insert(transfer.id, transfer);
        Ok(())
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<BankTransfer>> {
        let tables = self.tables.read().await;
        Ok(tables.transfers.get(&id).cloned())
    }

    async fn unmatched_transfers(&self) -> Result<Vec<BankTransfer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transfers
            .values()
            .filter(|t| !t.is_matched())
            .cloned()
            .collect())
    }

    async fn all_transfers(&self) -> Result<Vec<BankTransfer>> {
        let tables = self.tables.read().await;
        Ok(tables.transfers.values().cloned().collect())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let counter = match sequence {
            Sequence::Stay => &mut tables.next_stay,
            Sequence::Payment => &mut tables.next_payment,
            Sequence::Transfer => &mut tables.next_transfer,
        };
        *counter += 1;
        Ok(*counter)
    }

    async fn commit_booking(&self, stay: Stay, payment: Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if payment.stay_id != stay.id {
            return Err(BillingError::InvariantViolation(format!(
                "payment {} does not belong to stay {}",
                payment.id, stay.id
            )));
        }
        if tables.stays.contains_key(&stay.id) || tables.payment_by_stay.contains_key(&stay.id) {
            return Err(BillingError::InvariantViolation(format!(
                "stay {} is already booked",
                stay.id
            )));
        }
        tables.payment_by_stay.insert(stay.id, payment.id);
        tables.payments.insert(payment.id, payment);
        tables.stays.insert(stay.id, stay);
        Ok(())
    }

    async fn commit_stay_update(&self, stay: Stay, payment: Option<Payment>) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.stays.contains_key(&stay.id) {
            return Err(BillingError::not_found("stay", stay.id));
        }
        if let Some(payment) = &payment
            && tables.payment_by_stay.get(&stay.id) != Some(&payment.id)
        {
            return Err(BillingError::InvariantViolation(format!(
                "payment {} does not belong to stay {}",
                payment.id, stay.id
            )));
        }
        if let Some(payment) = payment {
            tables.payments.insert(payment.id, payment);
        }
        tables.stays.insert(stay.id, stay);
        Ok(())
    }

    async fn commit_match(&self, transfer: BankTransfer, payment: Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_transfer_unmatched(transfer.id)?;
        if transfer.matched_payment_id != Some(payment.id) {
            return Err(BillingError::InvariantViolation(format!(
                "transfer {} is not matched to payment {}",
                transfer.id, payment.id
            )));
        }
        if !tables.payments.contains_key(&payment.id) {
            return Err(BillingError::not_found("payment", payment.id));
        }
        tables.payments.insert(payment.id, payment);
        tables.transfers.insert(transfer.id, transfer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Money};
    use crate::domain::transfer::IncomingTransfer;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn stay(id: StayId, dog_id: DogId, start: u32, end: u32) -> Stay {
        Stay {
            id,
            dog_id,
            owner_id: 1,
            start_date: day(start),
            end_date: day(end),
            additional_fee_per_day: Money::ZERO,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn transfer(id: TransferId) -> BankTransfer {
        IncomingTransfer::new("111", "Jan", "stay 1", Amount::new(dec!(50)).unwrap())
            .into_transfer(id, Utc::now())
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.next_id(Sequence::Stay).await.unwrap(), 1);
        assert_eq!(ledger.next_id(Sequence::Stay).await.unwrap(), 2);
        assert_eq!(ledger.next_id(Sequence::Payment).await.unwrap(), 1);
        assert_eq!(ledger.next_id(Sequence::Transfer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_booking_is_unique_per_stay() {
        let ledger = InMemoryLedger::new();
        ledger
            .commit_booking(stay(1, 1, 1, 3), Payment::new(1, 1, Money::new(dec!(150))))
            .await
            .unwrap();

        let duplicate = ledger
            .commit_booking(stay(1, 1, 1, 3), Payment::new(2, 1, Money::new(dec!(150))))
            .await;
        assert!(matches!(duplicate, Err(BillingError::InvariantViolation(_))));
        assert!(ledger.get_payment(2).await.unwrap().is_none());
        assert_eq!(ledger.payment_for_stay(1).await.unwrap().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_stays_for_dog_filters_by_dog_and_range() {
        let ledger = InMemoryLedger::new();
        ledger
            .commit_booking(stay(1, 1, 1, 5), Payment::new(1, 1, Money::ZERO))
            .await
            .unwrap();
        ledger
            .commit_booking(stay(2, 2, 1, 5), Payment::new(2, 2, Money::ZERO))
            .await
            .unwrap();
        ledger
            .commit_booking(stay(3, 1, 10, 12), Payment::new(3, 3, Money::ZERO))
            .await
            .unwrap();

        let range = DateRange::new(day(4), day(8)).unwrap();
        let found = ledger.stays_for_dog(1, range).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_commit_match_is_monotonic() {
        let ledger = InMemoryLedger::new();
        ledger
            .commit_booking(stay(1, 1, 1, 1), Payment::new(1, 1, Money::new(dec!(50))))
            .await
            .unwrap();
        ledger.append_transfer(transfer(1)).await.unwrap();
        assert_eq!(ledger.unmatched_transfers().await.unwrap().len(), 1);

        let mut matched = transfer(1);
        matched.mark_matched(1).unwrap();
        let mut payment = ledger.get_payment(1).await.unwrap().unwrap();
        payment.settle();
        ledger
            .commit_match(matched.clone(), payment.clone())
            .await
            .unwrap();
        assert!(ledger.unmatched_transfers().await.unwrap().is_empty());

        let again = ledger.commit_match(matched, payment).await;
        assert!(matches!(again, Err(BillingError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_rejected_match_leaves_payment_untouched() {
        let ledger = InMemoryLedger::new();
        ledger
            .commit_booking(stay(1, 1, 1, 1), Payment::new(1, 1, Money::new(dec!(50))))
            .await
            .unwrap();

        // transfer 9 was never recorded
        let mut ghost = transfer(9);
        ghost.mark_matched(1).unwrap();
        let mut payment = ledger.get_payment(1).await.unwrap().unwrap();
        payment.settle();
        assert!(ledger.commit_match(ghost, payment).await.is_err());
        assert!(!ledger.get_payment(1).await.unwrap().unwrap().is_paid);
    }
}
