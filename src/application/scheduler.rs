//! Periodic driver for the reconciliation job.

use super::reconciliation::ReconciliationJob;
use crate::error::{BillingError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// A running schedule.
///
/// Dropping the handle also stops the schedule once any pass in progress
/// finishes, but without waiting for it; use [`JobHandle::stop`] to wait.
pub struct JobHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl JobHandle {
    /// Stops the schedule and waits for it to wind down.
    ///
    /// A pass already in progress runs to completion first. Returns the
    /// number of passes the schedule ran.
    pub async fn stop(self) -> Result<usize> {
        // the receiver is gone only if the task already exited
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|err| BillingError::InternalError(Box::new(err)))
    }
}

impl ReconciliationJob {
    /// Starts running a pass every `period`, the first one immediately.
    ///
    /// A pass that fails to start is logged and retried on the next tick;
    /// there are no retries in between.
    pub fn start(self: &Arc<Self>, period: Duration) -> JobHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let job = Arc::clone(self);
        let task = tokio::spawn(async move {
            info!(period_secs = period.as_secs_f64(), "reconciliation schedule started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut passes = 0;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        passes += 1;
                        if let Err(err) = job.run_reconciliation().await {
                            error!(%err, "scheduled reconciliation pass failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            info!(passes, "reconciliation schedule stopped");
            passes
        });
        JobHandle { shutdown, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::locks::PaymentLock;
    use crate::domain::directory::Owner;
    use crate::domain::money::{Amount, Money};
    use crate::domain::payment::Payment;
    use crate::domain::ports::{DirectoryStore, Ledger, PaymentStore, Sequence, TransferStore};
    use crate::domain::stay::Stay;
    use crate::domain::transfer::IncomingTransfer;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::events::MemoryEventSink;
    use crate::infrastructure::in_memory::InMemoryLedger;
    use chrono::{Duration as Days, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_picks_up_transfers_until_stopped() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .store_owner(Owner {
                id: 1,
                fullname: "Kasia".to_string(),
                email: "k@example.com".to_string(),
                phone_number: "1".to_string(),
                bank_account: Some("999".to_string()),
            })
            .await
            .unwrap();
        let today = Utc::now().date_naive();
        let stay = Stay {
            id: 1,
            dog_id: 1,
            owner_id: 1,
            start_date: today,
            end_date: today + Days::days(1),
            additional_fee_per_day: Money::ZERO,
            notes: None,
            created_at: Utc::now(),
        };
        ledger
            .commit_booking(stay, Payment::new(1, 1, Money::new(dec!(100))))
            .await
            .unwrap();

        let sink = Arc::new(MemoryEventSink::new());
        let job = Arc::new(ReconciliationJob::new(
            ledger.clone(),
            Arc::new(SystemClock),
            sink.clone(),
            PaymentLock::default(),
        ));
        let handle = job.start(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let id = ledger.next_id(Sequence::Transfer).await.unwrap();
        let transfer = IncomingTransfer::new("999", "Kasia", "stay 1", Amount::new(dec!(100)).unwrap())
            .into_transfer(id, Utc::now());
        ledger.append_transfer(transfer).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(ledger.get_payment(1).await.unwrap().unwrap().is_paid);

        let passes = handle.stop().await.unwrap();
        assert_eq!(passes, 2);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_handle_ends_the_schedule() {
        let ledger = Arc::new(InMemoryLedger::new());
        let sink = Arc::new(MemoryEventSink::new());
        let job = Arc::new(ReconciliationJob::new(
            ledger.clone(),
            Arc::new(SystemClock),
            sink.clone(),
            PaymentLock::default(),
        ));

        drop(job.start(Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let id = ledger.next_id(Sequence::Transfer).await.unwrap();
        let transfer = IncomingTransfer::new("999", "Kasia", "no reference", Amount::new(dec!(5)).unwrap())
            .into_transfer(id, Utc::now());
        ledger.append_transfer(transfer).await.unwrap();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(sink.events().is_empty());
        // the job's only other owner is the finished task
        assert_eq!(Arc::strong_count(&job), 1);
    }
}
