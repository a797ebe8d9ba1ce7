use crate::domain::payment::Payment;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PaymentRow {
    payment: u64,
    stay: u64,
    amount: String,
    received: String,
    paid: bool,
    overdue: bool,
    overdue_days: u32,
}

impl From<&Payment> for PaymentRow {
    fn from(payment: &Payment) -> Self {
        Self {
            payment: payment.id,
            stay: payment.stay_id,
            amount: payment.amount.to_string(),
            received: payment.amount_received.to_string(),
            paid: payment.is_paid,
            overdue: payment.is_overdue,
            overdue_days: payment.overdue_days,
        }
    }
}

/// Writes the payment ledger as CSV, one row per payment ordered by id.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments(&mut self, mut payments: Vec<Payment>) -> Result<()> {
        payments.sort_by_key(|p| p.id);
        for payment in &payments {
            self.writer.serialize(PaymentRow::from(payment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
