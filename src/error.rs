use crate::domain::directory::{DogId, OwnerId};
use crate::domain::stay::StayId;
use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum BillingError {
    #[error("invalid stay range: end date {end} is before start date {start}")]
    #[diagnostic(code(billing::invalid_range))]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("dog {dog_id} is already booked from {start} to {end} (stay {stay_id})")]
    #[diagnostic(
        code(billing::overlap),
        help("pick dates that do not share a calendar day with the existing stay")
    )]
    Overlap {
        dog_id: DogId,
        stay_id: StayId,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("stay {stay_id} has a non-positive billable duration ({days} days)")]
    #[diagnostic(code(billing::invalid_duration))]
    InvalidDuration { stay_id: StayId, days: i64 },

    #[error("{entity} {id} not found")]
    #[diagnostic(code(billing::not_found))]
    NotFound { entity: &'static str, id: u64 },

    #[error("dog {dog_id} does not belong to owner {owner_id}")]
    #[diagnostic(code(billing::ownership))]
    OwnershipMismatch { dog_id: DogId, owner_id: OwnerId },

    #[error("Validation error: {0}")]
    #[diagnostic(code(billing::validation))]
    ValidationError(String),

    #[error("Ledger invariant violated: {0}")]
    #[diagnostic(code(billing::invariant))]
    InvariantViolation(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),

    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BillingError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
