use super::booking::BookingService;
use super::locks::PaymentLock;
use super::reconciliation::ReconciliationJob;
use crate::domain::ports::{ClockRef, EventSinkRef, LedgerRef, Sequence};
use crate::domain::transfer::{BankTransfer, IncomingTransfer};
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// The main entry point for the billing engine.
///
/// `BillingEngine` owns the ledger and hands out the two services that
/// mutate it: [`BookingService`] for foreground requests and the
/// [`ReconciliationJob`] for scheduled or on-demand passes. Both are built
/// around the same payment lock.
pub struct BillingEngine {
    ledger: LedgerRef,
    clock: ClockRef,
    booking: BookingService,
    reconciliation: Arc<ReconciliationJob>,
}

impl BillingEngine {
    /// Creates a new `BillingEngine`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The record store for owners, dogs, stays, payments and transfers.
    /// * `clock` - Defines "now" for booking timestamps, transfer arrival and overdue days.
    /// * `sink` - Receives one event per transfer classified during reconciliation.
    pub fn new(ledger: LedgerRef, clock: ClockRef, sink: EventSinkRef) -> Self {
        let payment_lock = PaymentLock::default();
        let booking = BookingService::new(ledger.clone(), clock.clone(), payment_lock.clone());
        let reconciliation = Arc::new(ReconciliationJob::new(
            ledger.clone(),
            clock.clone(),
            sink,
            payment_lock,
        ));
        Self {
            ledger,
            clock,
            booking,
            reconciliation,
        }
    }

    pub fn booking(&self) -> &BookingService {
        &self.booking
    }

    pub fn reconciliation(&self) -> &Arc<ReconciliationJob> {
        &self.reconciliation
    }

    /// Records a transfer reported by the bank feed.
    ///
    /// The transfer is stamped with the clock at the moment of this call
    /// unless the feed supplied its own arrival time. Matching happens on the
    /// next reconciliation pass.
    pub async fn ingest_transfer(&self, incoming: IncomingTransfer) -> Result<BankTransfer> {
        let id = self.ledger.next_id(Sequence::Transfer).await?;
        let transfer = incoming.into_transfer(id, self.clock.now());
        self.ledger.append_transfer(transfer.clone()).await?;
        debug!(transfer_id = id, title = %transfer.title, "transfer recorded");
        Ok(transfer)
    }
}
