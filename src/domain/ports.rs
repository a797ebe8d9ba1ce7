use super::directory::{Dog, DogId, Owner, OwnerId};
use super::outcome::MatchEvent;
use super::payment::{Payment, PaymentId};
use super::stay::{DateRange, Stay, StayId};
use super::transfer::{BankTransfer, TransferId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Owners and dogs, maintained by the record-management layer.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn store_owner(&self, owner: Owner) -> Result<()>;
    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>>;
    async fn store_dog(&self, dog: Dog) -> Result<()>;
    async fn get_dog(&self, id: DogId) -> Result<Option<Dog>>;
}

#[async_trait]
pub trait StayStore: Send + Sync {
    async fn get_stay(&self, id: StayId) -> Result<Option<Stay>>;
    /// Stays of `dog_id` sharing at least one day with `range`.
    async fn stays_for_dog(&self, dog_id: DogId, range: DateRange) -> Result<Vec<Stay>>;
    async fn all_stays(&self) -> Result<Vec<Stay>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn payment_for_stay(&self, stay_id: StayId) -> Result<Option<Payment>>;
    async fn all_payments(&self) -> Result<Vec<Payment>>;
    /// Overwrites a single existing payment row.
    async fn update_payment(&self, payment: Payment) -> Result<()>;
}

#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn append_transfer(&self, transfer: BankTransfer) -> Result<()>;
    async fn get_transfer(&self, id: TransferId) -> Result<Option<BankTransfer>>;
    async fn unmatched_transfers(&self) -> Result<Vec<BankTransfer>>;
    async fn all_transfers(&self) -> Result<Vec<BankTransfer>>;
}

/// Identifier sequences handed out by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Stay,
    Payment,
    Transfer,
}

/// The full record store plus the compound writes that must land atomically.
///
/// Each `commit_*` method writes all of its rows or none of them.
#[async_trait]
pub trait Ledger: DirectoryStore + StayStore + PaymentStore + TransferStore {
    async fn next_id(&self, sequence: Sequence) -> Result<u64>;

    /// Inserts a new stay together with its payment.
    ///
    /// Fails if a payment already exists for the stay.
    async fn commit_booking(&self, stay: Stay, payment: Payment) -> Result<()>;

    /// Rewrites an edited stay and, when its price changed, its payment.
    async fn commit_stay_update(&self, stay: Stay, payment: Option<Payment>) -> Result<()>;

    /// Persists a matched transfer together with the payment it was credited to.
    ///
    /// Fails if the stored transfer is already matched.
    async fn commit_match(&self, transfer: BankTransfer, payment: Payment) -> Result<()>;
}

/// Source of the current time, injected so reconciliation runs are reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub type LedgerRef = Arc<dyn Ledger>;
pub type ClockRef = Arc<dyn Clock>;

/// Receives one event per transfer classified by the matcher.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MatchEvent);
}

pub type EventSinkRef = Arc<dyn EventSink>;
