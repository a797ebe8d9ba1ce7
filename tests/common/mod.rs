use chrono::NaiveDate;
use kennel_billing::application::engine::BillingEngine;
use kennel_billing::domain::directory::{Dog, Owner};
use kennel_billing::infrastructure::clock::FixedClock;
use kennel_billing::infrastructure::events::MemoryEventSink;
use kennel_billing::infrastructure::in_memory::InMemoryLedger;
use std::io::{Error, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const BOOKINGS_HEADER: &str =
    "owner,owner_name,bank_account,dog,dog_name,start_date,end_date,fee_per_day,notes";
pub const TRANSFERS_HEADER: &str = "from_account,sender_name,title,amount";

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

/// Writes `rows` under `header` into a temporary CSV file.
pub fn csv_file(header: &str, rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{header}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(file)
}

pub struct Harness {
    pub engine: BillingEngine,
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<MemoryEventSink>,
}

/// An in-memory engine with `dogs` dogs, dog `n` belonging to owner `n`.
///
/// Owner `n` pays from account `ACC-n`.
pub async fn harness(today: NaiveDate, dogs: u64) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(FixedClock::at_date(today));
    let events = Arc::new(MemoryEventSink::new());
    let engine = BillingEngine::new(ledger.clone(), clock.clone(), events.clone());

    for id in 1..=dogs {
        engine
            .booking()
            .register_owner(Owner {
                id,
                fullname: format!("Owner {id}"),
                email: format!("owner{id}@example.com"),
                phone_number: String::new(),
                bank_account: Some(format!("ACC-{id}")),
            })
            .await
            .unwrap();
        engine
            .booking()
            .register_dog(Dog {
                id,
                owner_id: id,
                name: format!("Dog {id}"),
                age: 3,
                notes: None,
            })
            .await
            .unwrap();
    }

    Harness {
        engine,
        ledger,
        clock,
        events,
    }
}
