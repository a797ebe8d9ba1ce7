//! Application layer orchestrating the billing engine.
//!
//! `BillingEngine` wires a ledger, a clock and an event sink into the two
//! paths that touch payments: foreground booking (`BookingService`) and the
//! background `ReconciliationJob`. Both share one payment lock, so a
//! scheduled pass and a manual settlement never interleave their
//! read-modify-write of the same payment row.

pub mod booking;
pub mod conflict;
pub mod engine;
pub mod locks;
pub mod matcher;
pub mod reconciliation;
pub mod scheduler;
