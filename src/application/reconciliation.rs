use super::locks::PaymentLock;
use super::matcher::match_transfer;
use crate::domain::outcome::{MatchEvent, MatchOutcome, OutcomeKind};
use crate::domain::payment::{PaymentId, PaymentStatus};
use crate::domain::ports::{ClockRef, EventSinkRef, LedgerRef};
use crate::domain::transfer::TransferId;
use crate::error::{BillingError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Summary of one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub business_day: Option<NaiveDate>,
    /// Unmatched transfers looked at during the pass.
    pub examined: usize,
    pub outcomes: BTreeMap<OutcomeKind, usize>,
    /// Transfers whose processing failed; they stay unmatched for the next pass.
    pub failed: Vec<TransferId>,
    /// Partially paid payments whose overdue day count moved.
    pub overdue_refreshed: usize,
}

impl ReconciliationReport {
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.get(&kind).copied().unwrap_or(0)
    }

    /// Transfers attached to a payment during the pass.
    pub fn matched(&self) -> usize {
        self.count(OutcomeKind::Matched) + self.count(OutcomeKind::PartiallyMatched)
    }

    /// Whether the pass wrote anything.
    pub fn changed_ledger(&self) -> bool {
        self.matched() > 0 || self.overdue_refreshed > 0
    }

    fn record(&mut self, outcome: &MatchOutcome) {
        *self.outcomes.entry(outcome.kind()).or_default() += 1;
    }
}

/// Matches pending bank transfers to payments and keeps overdue counters current.
///
/// Constructed with everything it touches: the ledger, the clock that defines
/// "today" and the sink receiving one event per classified transfer. Runs on
/// demand through [`ReconciliationJob::trigger`] or periodically once
/// [`ReconciliationJob::start`]ed. Passes never overlap: a trigger arriving
/// while a scheduled pass is running waits for it to finish.
pub struct ReconciliationJob {
    ledger: LedgerRef,
    clock: ClockRef,
    sink: EventSinkRef,
    payment_lock: PaymentLock,
    pass_lock: Mutex<()>,
}

impl ReconciliationJob {
    pub fn new(
        ledger: LedgerRef,
        clock: ClockRef,
        sink: EventSinkRef,
        payment_lock: PaymentLock,
    ) -> Self {
        Self {
            ledger,
            clock,
            sink,
            payment_lock,
            pass_lock: Mutex::new(()),
        }
    }

    /// On-demand entry point; same semantics as a scheduled pass.
    pub async fn trigger(&self) -> Result<ReconciliationReport> {
        info!("reconciliation triggered on demand");
        self.run_reconciliation().await
    }

    /// Runs one full pass.
    ///
    /// Every unmatched transfer is handed to the matcher in isolation: a
    /// failure is logged, listed in the report and leaves that transfer
    /// unmatched for the next pass, while the rest carry on. Afterwards the
    /// overdue day count of every partially paid payment is brought up to date.
    /// Only a failure to list the pending work aborts the pass.
    pub async fn run_reconciliation(&self) -> Result<ReconciliationReport> {
        let _pass = self.pass_lock.lock().await;
        let today = self.clock.today();
        let mut report = ReconciliationReport {
            business_day: Some(today),
            ..Default::default()
        };

        let pending = self.ledger.unmatched_transfers().await?;
        debug!(pending = pending.len(), %today, "reconciliation pass started");
        for transfer in pending {
            report.examined += 1;
            match self.reconcile_transfer(transfer.id, today).await {
                Ok(Some(outcome)) => report.record(&outcome),
                Ok(None) => {}
                Err(err) => {
                    error!(transfer_id = transfer.id, %err, "failed to reconcile transfer");
                    report.failed.push(transfer.id);
                }
            }
        }

        report.overdue_refreshed = self.refresh_overdue(today).await?;

        info!(
            examined = report.examined,
            matched = report.matched(),
            failed = report.failed.len(),
            overdue_refreshed = report.overdue_refreshed,
            "reconciliation pass finished"
        );
        Ok(report)
    }

    /// Matches a single transfer and commits the result.
    ///
    /// Returns `None` when the transfer was matched by someone else since it was listed.
    async fn reconcile_transfer(
        &self,
        transfer_id: TransferId,
        today: NaiveDate,
    ) -> Result<Option<MatchOutcome>> {
        let _payments = self.payment_lock.lock().await;
        let transfer = self
            .ledger
            .get_transfer(transfer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("transfer", transfer_id))?;
        if transfer.is_matched() {
            return Ok(None);
        }

        let plan = match_transfer(self.ledger.as_ref(), &transfer, today).await?;
        if let Some((transfer, payment)) = plan.commit {
            self.ledger.commit_match(transfer, payment).await?;
        }
        self.sink.emit(&MatchEvent {
            transfer_id,
            outcome: plan.outcome.clone(),
            at: self.clock.now(),
        });
        Ok(Some(plan.outcome))
    }

    async fn refresh_overdue(&self, today: NaiveDate) -> Result<usize> {
        let candidates: Vec<PaymentId> = self
            .ledger
            .all_payments()
            .await?
            .into_iter()
            .filter(|p| p.status() == PaymentStatus::PartiallyPaidOverdue)
            .map(|p| p.id)
            .collect();

        let mut refreshed = 0;
        for payment_id in candidates {
            match self.refresh_payment(payment_id, today).await {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(err) => error!(payment_id, %err, "failed to refresh overdue days"),
            }
        }
        Ok(refreshed)
    }

    async fn refresh_payment(&self, payment_id: PaymentId, today: NaiveDate) -> Result<bool> {
        let _payments = self.payment_lock.lock().await;
        let Some(mut payment) = self.ledger.get_payment(payment_id).await? else {
            return Ok(false);
        };
        let stay = self
            .ledger
            .get_stay(payment.stay_id)
            .await?
            .ok_or_else(|| BillingError::not_found("stay", payment.stay_id))?;
        if !payment.refresh_overdue(today, stay.end_date) {
            return Ok(false);
        }
        debug!(payment_id, overdue_days = payment.overdue_days, "overdue days moved");
        self.ledger.update_payment(payment).await?;
        Ok(true)
    }
}
