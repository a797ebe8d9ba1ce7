use super::conflict;
use super::locks::{DogLocks, PaymentLock};
use crate::domain::directory::{Dog, Owner};
use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::{ClockRef, LedgerRef, Sequence};
use crate::domain::rate::calculate_amount;
use crate::domain::stay::{DateRange, NewStay, Stay, StayId, StayUpdate, ensure_fee_not_negative};
use crate::domain::transfer::BankTransfer;
use crate::error::{BillingError, Result};
use tracing::{debug, info, warn};

/// Foreground operations on stays and their payments.
///
/// A booking takes the dog's lock, checks for overlaps, prices the stay and
/// commits stay and payment in one ledger write. Nothing is written when any
/// of those steps fails.
pub struct BookingService {
    ledger: LedgerRef,
    clock: ClockRef,
    dog_locks: DogLocks,
    payment_lock: PaymentLock,
}

impl BookingService {
    pub fn new(ledger: LedgerRef, clock: ClockRef, payment_lock: PaymentLock) -> Self {
        Self {
            ledger,
            clock,
            dog_locks: DogLocks::new(),
            payment_lock,
        }
    }

    pub async fn register_owner(&self, owner: Owner) -> Result<()> {
        debug!(owner_id = owner.id, "registering owner");
        self.ledger.store_owner(owner).await
    }

    /// Registers a dog; its owner must already be known.
    pub async fn register_dog(&self, dog: Dog) -> Result<()> {
        if self.ledger.get_owner(dog.owner_id).await?.is_none() {
            return Err(BillingError::not_found("owner", dog.owner_id));
        }
        debug!(dog_id = dog.id, owner_id = dog.owner_id, "registering dog");
        self.ledger.store_dog(dog).await
    }

    /// Books a stay and creates its payment.
    ///
    /// # Errors
    ///
    /// * [`BillingError::InvalidRange`] when the end date precedes the start date.
    /// * [`BillingError::Overlap`] when the dog is already booked on any of the days.
    /// * [`BillingError::InvalidDuration`] if pricing fails; the stay is not created.
    pub async fn create_stay(&self, request: NewStay) -> Result<(Stay, Payment)> {
        let range = DateRange::new(request.start_date, request.end_date)?;
        ensure_fee_not_negative(request.additional_fee_per_day)?;

        let dog = self
            .ledger
            .get_dog(request.dog_id)
            .await?
            .ok_or_else(|| BillingError::not_found("dog", request.dog_id))?;
        if self.ledger.get_owner(request.owner_id).await?.is_none() {
            return Err(BillingError::not_found("owner", request.owner_id));
        }
        if dog.owner_id != request.owner_id {
            return Err(BillingError::OwnershipMismatch {
                dog_id: dog.id,
                owner_id: request.owner_id,
            });
        }

        let _dog_guard = self.dog_locks.lock(dog.id).await;
        if let Err(err) = conflict::ensure_available(&*self.ledger, dog.id, range, None).await {
            warn!(dog_id = dog.id, %err, "booking rejected");
            return Err(err);
        }

        let stay = Stay {
            id: self.ledger.next_id(Sequence::Stay).await?,
            dog_id: request.dog_id,
            owner_id: request.owner_id,
            start_date: request.start_date,
            end_date: request.end_date,
            additional_fee_per_day: request.additional_fee_per_day,
            notes: request.notes,
            created_at: self.clock.now(),
        };
        let amount = calculate_amount(&stay)?;
        let payment = Payment::new(self.ledger.next_id(Sequence::Payment).await?, stay.id, amount);

        self.ledger
            .commit_booking(stay.clone(), payment.clone())
            .await?;
        info!(
            stay_id = stay.id,
            dog_id = stay.dog_id,
            start = %stay.start_date,
            end = %stay.end_date,
            %amount,
            "stay booked"
        );
        Ok((stay, payment))
    }

    /// Applies an explicit edit to a stay.
    ///
    /// Date changes go through the same range and overlap checks as a new
    /// booking, ignoring the stay itself. When dates or the surcharge change
    /// and the payment is not settled yet, its amount is recomputed from the
    /// edited stay in the same write.
    pub async fn update_stay(&self, stay_id: StayId, update: StayUpdate) -> Result<Stay> {
        let dog_id = self
            .ledger
            .get_stay(stay_id)
            .await?
            .ok_or_else(|| BillingError::not_found("stay", stay_id))?
            .dog_id;

        let _dog_guard = self.dog_locks.lock(dog_id).await;
        // Re-read under the lock; the stay may have been edited while we waited.
        let current = self
            .ledger
            .get_stay(stay_id)
            .await?
            .ok_or_else(|| BillingError::not_found("stay", stay_id))?;
        let updated = update.apply_to(&current);
        let range = DateRange::new(updated.start_date, updated.end_date)?;
        ensure_fee_not_negative(updated.additional_fee_per_day)?;
        conflict::ensure_available(&*self.ledger, dog_id, range, Some(stay_id)).await?;

        if !update.changes_billing() {
            self.ledger.commit_stay_update(updated.clone(), None).await?;
            return Ok(updated);
        }

        let _payment_guard = self.payment_lock.lock().await;
        let repriced = match self.ledger.payment_for_stay(stay_id).await? {
            Some(mut payment) => {
                let amount = calculate_amount(&updated)?;
                payment.reprice(amount).then_some(payment)
            }
            None => None,
        };
        if let Some(payment) = &repriced {
            info!(
                stay_id,
                payment_id = payment.id,
                amount = %payment.amount,
                "payment repriced after stay edit"
            );
        }
        self.ledger.commit_stay_update(updated.clone(), repriced).await?;
        Ok(updated)
    }

    /// Marks a payment as paid by hand, e.g. after a cash payment at pickup.
    ///
    /// Settling an already paid payment is a no-op.
    pub async fn settle_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let _payment_guard = self.payment_lock.lock().await;
        let mut payment = self
            .ledger
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| BillingError::not_found("payment", payment_id))?;
        if payment.settle() {
            self.ledger.update_payment(payment.clone()).await?;
            info!(payment_id, stay_id = payment.stay_id, "payment settled manually");
        }
        Ok(payment)
    }

    pub async fn payment_for_stay(&self, stay_id: StayId) -> Result<Option<Payment>> {
        self.ledger.payment_for_stay(stay_id).await
    }

    pub async fn unpaid_payments(&self) -> Result<Vec<Payment>> {
        Ok(self
            .ledger
            .all_payments()
            .await?
            .into_iter()
            .filter(|p| !p.is_paid)
            .collect())
    }

    pub async fn overdue_payments(&self) -> Result<Vec<Payment>> {
        Ok(self
            .ledger
            .all_payments()
            .await?
            .into_iter()
            .filter(|p| p.status() == PaymentStatus::PartiallyPaidOverdue)
            .collect())
    }

    /// Lists transfers, optionally only the matched (`Some(true)`) or unmatched ones.
    pub async fn transfers(&self, matched: Option<bool>) -> Result<Vec<BankTransfer>> {
        let transfers = self.ledger.all_transfers().await?;
        Ok(match matched {
            Some(wanted) => transfers
                .into_iter()
                .filter(|t| t.is_matched() == wanted)
                .collect(),
            None => transfers,
        })
    }
}
