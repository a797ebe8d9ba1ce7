//! Tariff applied to every stay.

use super::money::Money;
use super::stay::Stay;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Base price of one boarded day, before any per-stay surcharge.
pub const DAILY_RATE: Decimal = dec!(50.0);

/// Number of billed days; both the arrival and the departure day count.
pub fn billable_days(stay: &Stay) -> i64 {
    (stay.end_date - stay.start_date).num_days() + 1
}

/// Computes the amount owed for `stay`.
///
/// `days * (DAILY_RATE + additional_fee_per_day)`. Fails with
/// [`BillingError::InvalidDuration`] when the stay has inverted dates, which
/// booking validation prevents but an out-of-band edit can still produce.
/// A surcharge too large for the amount to be represented is a
/// [`BillingError::ValidationError`].
pub fn calculate_amount(stay: &Stay) -> Result<Money> {
    let days = billable_days(stay);
    if days <= 0 {
        return Err(BillingError::InvalidDuration {
            stay_id: stay.id,
            days,
        });
    }
    DAILY_RATE
        .checked_add(stay.additional_fee_per_day.0)
        .and_then(|per_day| Decimal::from(days).checked_mul(per_day))
        .map(Money::new)
        .ok_or_else(|| {
            BillingError::ValidationError(format!(
                "amount for stay {} is out of range ({days} days at {} per day surcharge)",
                stay.id, stay.additional_fee_per_day
            ))
        })
}
