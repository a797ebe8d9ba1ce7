//! Double-booking protection.

use crate::domain::directory::DogId;
use crate::domain::ports::Ledger;
use crate::domain::stay::{DateRange, Stay, StayId};
use crate::error::{BillingError, Result};

/// Returns the first stay in `existing` that shares a day with `range`,
/// ignoring the stay identified by `excluding`.
pub fn find_conflict<'a>(
    existing: &'a [Stay],
    range: &DateRange,
    excluding: Option<StayId>,
) -> Option<&'a Stay> {
    existing
        .iter()
        .filter(|stay| Some(stay.id) != excluding)
        .find(|stay| stay.overlaps(range))
}

/// Fails with [`BillingError::Overlap`] if `dog_id` already has a stay
/// overlapping `range`.
///
/// The caller must hold the dog's booking lock until its own write commits;
/// otherwise two requests can both pass this check.
pub async fn ensure_available(
    ledger: &dyn Ledger,
    dog_id: DogId,
    range: DateRange,
    excluding: Option<StayId>,
) -> Result<()> {
    let existing = ledger.stays_for_dog(dog_id, range).await?;
    match find_conflict(&existing, &range, excluding) {
        Some(conflict) => Err(BillingError::Overlap {
            dog_id,
            stay_id: conflict.id,
            start: conflict.start_date,
            end: conflict.end_date,
        }),
        None => Ok(()),
    }
}
