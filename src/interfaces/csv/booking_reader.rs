use crate::domain::directory::{Dog, DogId, Owner, OwnerId};
use crate::domain::money::Money;
use crate::domain::stay::NewStay;
use crate::error::{BillingError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

/// One booking request as it appears in a bookings CSV.
///
/// A row carries enough of the owner and the dog to register them on first
/// sight, so a fresh ledger can be populated from the bookings file alone.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingRow {
    pub owner: OwnerId,
    pub owner_name: String,
    #[serde(default)]
    pub bank_account: Option<String>,
    pub dog: DogId,
    pub dog_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub fee_per_day: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRow {
    pub fn owner(&self) -> Owner {
        Owner {
            id: self.owner,
            fullname: self.owner_name.clone(),
            email: String::new(),
            phone_number: String::new(),
            bank_account: self.bank_account.clone().filter(|a| !a.is_empty()),
        }
    }

    pub fn dog(&self) -> Dog {
        Dog {
            id: self.dog,
            owner_id: self.owner,
            name: self.dog_name.clone(),
            age: 0,
            notes: None,
        }
    }

    pub fn stay(&self) -> NewStay {
        let mut stay = NewStay::new(self.dog, self.owner, self.start_date, self.end_date);
        if let Some(fee) = self.fee_per_day {
            stay = stay.with_fee(fee);
        }
        match self.notes.as_deref() {
            Some(notes) if !notes.is_empty() => stay.with_notes(notes),
            _ => stay,
        }
    }
}

/// Reads booking requests from a CSV source.
pub struct BookingReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> BookingReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a malformed row yields an error without ending the stream.
    pub fn bookings(self) -> impl Iterator<Item = Result<BookingRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}
