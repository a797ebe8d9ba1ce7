use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kennel_billing::application::engine::BillingEngine;
use kennel_billing::domain::ports::{ClockRef, DirectoryStore, LedgerRef, PaymentStore};
use kennel_billing::infrastructure::clock::{FixedClock, SystemClock};
use kennel_billing::infrastructure::events::TracingEventSink;
use kennel_billing::infrastructure::in_memory::InMemoryLedger;
#[cfg(feature = "storage-rocksdb")]
use kennel_billing::infrastructure::rocksdb::RocksDBLedger;
use kennel_billing::interfaces::csv::booking_reader::{BookingReader, BookingRow};
use kennel_billing::interfaces::csv::payment_writer::PaymentWriter;
use kennel_billing::interfaces::csv::transfer_reader::TransferReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "KENNEL_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Pins the business day (YYYY-MM-DD) instead of reading the system clock.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Imports bookings and transfers, runs one reconciliation pass and prints the payments.
    Run {
        /// Bookings CSV file
        #[arg(long)]
        bookings: Option<PathBuf>,

        /// Bank transfers CSV file
        #[arg(long)]
        transfers: Option<PathBuf>,
    },
    /// Imports the given files, then reconciles periodically until interrupted.
    Watch {
        #[arg(long)]
        bookings: Option<PathBuf>,

        #[arg(long)]
        transfers: Option<PathBuf>,

        /// Seconds between reconciliation passes
        #[arg(long, env = "KENNEL_RECONCILE_INTERVAL_SECS", default_value_t = 60)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    let ledger = open_ledger(cli.db_path.as_deref())?;
    let clock: ClockRef = match cli.today {
        Some(day) => Arc::new(FixedClock::at_date(day)),
        None => Arc::new(SystemClock),
    };
    let engine = BillingEngine::new(ledger.clone(), clock, Arc::new(TracingEventSink));

    match cli.command {
        Command::Run {
            bookings,
            transfers,
        } => {
            import(&engine, &ledger, bookings.as_deref(), transfers.as_deref()).await?;
            engine.reconciliation().trigger().await?;
        }
        Command::Watch {
            bookings,
            transfers,
            interval_secs,
        } => {
            import(&engine, &ledger, bookings.as_deref(), transfers.as_deref()).await?;
            let handle = engine
                .reconciliation()
                .start(Duration::from_secs(interval_secs.max(1)));
            tokio::signal::ctrl_c().await.into_diagnostic()?;
            info!("interrupt received, stopping");
            handle.stop().await?;
        }
    }

    let payments = ledger.all_payments().await?;
    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(payments)?;

    Ok(())
}

fn open_ledger(db_path: Option<&Path>) -> Result<LedgerRef> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        info!(path = %path.display(), "opening persistent ledger");
        return Ok(Arc::new(RocksDBLedger::open(path)?));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }

    Ok(Arc::new(InMemoryLedger::new()))
}

async fn import(
    engine: &BillingEngine,
    ledger: &LedgerRef,
    bookings: Option<&Path>,
    transfers: Option<&Path>,
) -> Result<()> {
    if let Some(path) = bookings {
        let file = File::open(path).into_diagnostic()?;
        for (line, row) in BookingReader::new(file).bookings().enumerate() {
            let booked = match row {
                Ok(row) => book(engine, ledger, &row).await,
                Err(err) => Err(err),
            };
            if let Err(err) = booked {
                warn!(row = line + 1, %err, "skipping booking");
            }
        }
    }

    if let Some(path) = transfers {
        let file = File::open(path).into_diagnostic()?;
        for (line, row) in TransferReader::new(file).transfers().enumerate() {
            let recorded = match row {
                Ok(incoming) => engine.ingest_transfer(incoming).await.map(|_| ()),
                Err(err) => Err(err),
            };
            if let Err(err) = recorded {
                warn!(row = line + 1, %err, "skipping transfer");
            }
        }
    }

    Ok(())
}

/// Registers the row's owner and dog on first sight, then books the stay.
async fn book(
    engine: &BillingEngine,
    ledger: &LedgerRef,
    row: &BookingRow,
) -> kennel_billing::error::Result<()> {
    if ledger.get_owner(row.owner).await?.is_none() {
        engine.booking().register_owner(row.owner()).await?;
    }
    if ledger.get_dog(row.dog).await?.is_none() {
        engine.booking().register_dog(row.dog()).await?;
    }
    engine.booking().create_stay(row.stay()).await?;
    Ok(())
}
