use crate::domain::transfer::IncomingTransfer;
use crate::error::{BillingError, Result};
use std::io::Read;

/// Reads bank-feed transfers from a CSV source.
///
/// Expected columns are `from_account, sender_name, title, amount` with an
/// optional RFC 3339 `received_at`. Rows with a non-positive amount are
/// reported as errors.
pub struct TransferReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransferReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn transfers(self) -> impl Iterator<Item = Result<IncomingTransfer>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "from_account, sender_name, title, amount, received_at\n\
                    PL11 2222, Anna Nowak, Stay 4, 150, 2025-07-10T09:30:00Z\n\
                    PL11 2222, Anna Nowak, \"pobyt, stay#5\", 75.5,";
        let rows: Vec<Result<IncomingTransfer>> =
            TransferReader::new(data.as_bytes()).transfers().collect();

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.amount.value(), dec!(150));
        assert_eq!(
            first.received_at,
            Some(Utc.with_ymd_and_hms(2025, 7, 10, 9, 30, 0).unwrap())
        );
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.title, "pobyt, stay#5");
        assert_eq!(second.received_at, None);
    }

    #[test]
    fn test_reader_rejects_non_positive_amount() {
        let data = "from_account, sender_name, title, amount\n\
                    PL11, Anna, Stay 4, 0\n\
                    PL11, Anna, Stay 4, -10\n\
                    PL11, Anna, Stay 4, 10";
        let rows: Vec<Result<IncomingTransfer>> =
            TransferReader::new(data.as_bytes()).transfers().collect();

        assert!(rows[0].is_err());
        assert!(rows[1].is_err());
        assert!(rows[2].is_ok());
    }
}
