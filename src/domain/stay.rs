use super::directory::{DogId, OwnerId};
use super::money::Money;
use crate::error::{BillingError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type StayId = u64;

/// An inclusive range of calendar days.
///
/// Construction through [`DateRange::new`] guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(BillingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Two inclusive ranges overlap when they share at least one calendar day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A booked boarding period for one dog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub id: StayId,
    pub dog_id: DogId,
    pub owner_id: OwnerId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub additional_fee_per_day: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Stay {
    /// The stay's booked range, re-validated because stored dates may have been edited out of band.
    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Overlap check against raw dates, tolerant of a stored stay with inverted dates.
    pub fn overlaps(&self, range: &DateRange) -> bool {
        self.start_date <= range.end() && range.start() <= self.end_date
    }
}

/// A booking request, before an id is allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStay {
    pub dog_id: DogId,
    pub owner_id: OwnerId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub additional_fee_per_day: Money,
    pub notes: Option<String>,
}

impl NewStay {
    pub fn new(dog_id: DogId, owner_id: OwnerId, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            dog_id,
            owner_id,
            start_date,
            end_date,
            additional_fee_per_day: Money::ZERO,
            notes: None,
        }
    }

    pub fn with_fee(mut self, fee: Money) -> Self {
        self.additional_fee_per_day = fee;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Explicit edit of an existing stay. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StayUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub additional_fee_per_day: Option<Money>,
    pub notes: Option<String>,
}

impl StayUpdate {
    /// Whether the edit touches anything the amount owed depends on.
    pub fn changes_billing(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.additional_fee_per_day.is_some()
    }

    pub fn apply_to(&self, stay: &Stay) -> Stay {
        let mut updated = stay.clone();
        if let Some(start) = self.start_date {
            updated.start_date = start;
        }
        if let Some(end) = self.end_date {
            updated.end_date = end;
        }
        if let Some(fee) = self.additional_fee_per_day {
            updated.additional_fee_per_day = fee;
        }
        if let Some(notes) = &self.notes {
            updated.notes = Some(notes.clone());
        }
        updated
    }
}

pub(crate) fn ensure_fee_not_negative(fee: Money) -> Result<()> {
    if fee.is_negative() {
        return Err(BillingError::ValidationError(format!(
            "additional fee per day must not be negative, got {fee}"
        )));
    }
    Ok(())
}
