use crate::domain::directory::{Dog, DogId, Owner, OwnerId};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{
    DirectoryStore, Ledger, PaymentStore, Sequence, StayStore, TransferStore,
};
use crate::domain::stay::{DateRange, Stay, StayId};
use crate::domain::transfer::{BankTransfer, TransferId};
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_OWNERS: &str = "owners";
pub const CF_DOGS: &str = "dogs";
pub const CF_STAYS: &str = "stays";
/// Index of stays per dog, keyed by `dog_id ++ stay_id` (both big-endian).
pub const CF_DOG_STAYS: &str = "dog_stays";
pub const CF_PAYMENTS: &str = "payments";
/// Maps a stay id to the id of its single payment.
pub const CF_PAYMENT_BY_STAY: &str = "payment_by_stay";
pub const CF_TRANSFERS: &str = "transfers";
/// Identifier counters.
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 8] = [
    CF_OWNERS,
    CF_DOGS,
    CF_STAYS,
    CF_DOG_STAYS,
    CF_PAYMENTS,
    CF_PAYMENT_BY_STAY,
    CF_TRANSFERS,
    CF_META,
];

/// A persistent ledger backed by RocksDB.
///
/// Every entity lives in its own column family, values encoded as JSON and
/// keys as big-endian ids so iteration follows id order. Compound commits go
/// through a single `WriteBatch`, which RocksDB applies atomically; the
/// `writer` mutex keeps the read-check-write sequence of each commit from
/// interleaving with another one.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBLedger {
    /// Opens or creates a ledger at `path`, creating any missing column family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BillingError::internal(format!("{name} column family not found")))
    }

    fn get<T: DeserializeOwned>(&self, cf: &str, key: u64) -> Result<Option<T>> {
        match self.db.get_pinned_cf(self.cf(cf)?, key.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, cf: &str, key: u64) -> Result<bool> {
        Ok(self.db.get_pinned_cf(self.cf(cf)?, key.to_be_bytes())?.is_some())
    }

    fn put<T: Serialize>(&self, cf: &str, key: u64, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn batch_put<T: Serialize>(&self, batch: &mut WriteBatch, cf: &str, key: u64, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        batch.put_cf(self.cf(cf)?, key.to_be_bytes(), bytes);
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn stay_ids_for_dog(&self, dog_id: DogId) -> Result<Vec<StayId>> {
        let prefix = dog_id.to_be_bytes();
        let mut ids = Vec::new();
        let iter = self
            .db
            .iterator_cf(self.cf(CF_DOG_STAYS)?, IteratorMode::From(&prefix[..], Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let stay = key
                .get(8..16)
                .and_then(|raw| <[u8; 8]>::try_from(raw).ok())
                .ok_or_else(|| BillingError::internal("malformed dog_stays key"))?;
            ids.push(u64::from_be_bytes(stay));
        }
        Ok(ids)
    }
}

fn sequence_key(sequence: Sequence) -> &'static [u8] {
    match sequence {
        Sequence::Stay => b"seq:stay",
        Sequence::Payment => b"seq:payment",
        Sequence::Transfer => b"seq:transfer",
    }
}

fn dog_stay_key(dog_id: DogId, stay_id: StayId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&dog_id.to_be_bytes());
    key[8..].copy_from_slice(&stay_id.to_be_bytes());
    key
}

#[async_trait]
impl DirectoryStore for RocksDBLedger {
    async fn store_owner(&self, owner: Owner) -> Result<()> {
        self.put(CF_OWNERS, owner.id, &owner)
    }

    async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>> {
        self.get(CF_OWNERS, id)
    }

    async fn store_dog(&self, dog: Dog) -> Result<()> {
        self.put(CF_DOGS, dog.id, &dog)
    }

    async fn get_dog(&self, id: DogId) -> Result<Option<Dog>> {
        self.get(CF_DOGS, id)
    }
}

#[async_trait]
impl StayStore for RocksDBLedger {
    async fn get_stay(&self, id: StayId) -> Result<Option<Stay>> {
        self.get(CF_STAYS, id)
    }

    async fn stays_for_dog(&self, dog_id: DogId, range: DateRange) -> Result<Vec<Stay>> {
        let mut stays = Vec::new();
        for id in self.stay_ids_for_dog(dog_id)? {
            if let Some(stay) = self.get::<Stay>(CF_STAYS, id)?
                && stay.overlaps(&range)
            {
                stays.push(stay);
            }
        }
        Ok(stays)
    }

    async fn all_stays(&self) -> Result<Vec<Stay>> {
        self.scan(CF_STAYS)
    }
}

#[async_trait]
impl PaymentStore for RocksDBLedger {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.get(CF_PAYMENTS, id)
    }

    async fn payment_for_stay(&self, stay_id: StayId) -> Result<Option<Payment>> {
        match self.get::<PaymentId>(CF_PAYMENT_BY_STAY, stay_id)? {
            Some(id) => self.get(CF_PAYMENTS, id),
            None => Ok(None),
        }
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        self.scan(CF_PAYMENTS)
    }

    async fn update_payment(&self, payment: Payment) -> Result<()> {
        let _guard = self.writer.lock().await;
        if !self.contains(CF_PAYMENTS, payment.id)? {
            return Err(BillingError::not_found("payment", payment.id));
        }
        self.put(CF_PAYMENTS, payment.id, &payment)
    }
}

#[async_trait]
impl TransferStore for RocksDBLedger {
    async fn append_transfer(&self, transfer: BankTransfer) -> Result<()> {
        let _guard = self.writer.lock().await;
        if self.contains(CF_TRANSFERS, transfer.id)? {
            return Err(BillingError::InvariantViolation(format!(
                "transfer {} already recorded",
                transfer.id
            )));
        }
        self.put(CF_TRANSFERS, transfer.id, &transfer)
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<BankTransfer>> {
        self.get(CF_TRANSFERS, id)
    }

    async fn unmatched_transfers(&self) -> Result<Vec<BankTransfer>> {
        let transfers: Vec<BankTransfer> = self.scan(CF_TRANSFERS)?;
        Ok(transfers.into_iter().filter(|t| !t.is_matched()).collect())
    }

    async fn all_transfers(&self) -> Result<Vec<BankTransfer>> {
        self.scan(CF_TRANSFERS)
    }
}

#[async_trait]
impl Ledger for RocksDBLedger {
    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        let _guard = self.writer.lock().await;
        let meta = self.cf(CF_META)?;
        let key = sequence_key(sequence);
        let current = match self.db.get_pinned_cf(meta, key)? {
            Some(raw) => {
                let bytes = <[u8; 8]>::try_from(raw.as_ref())
                    .map_err(|_| BillingError::internal("malformed sequence counter"))?;
                u64::from_be_bytes(bytes)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(meta, key, next.to_be_bytes())?;
        Ok(next)
    }

    async fn commit_booking(&self, stay: Stay, payment: Payment) -> Result<()> {
        let _guard = self.writer.lock().await;
        if payment.stay_id != stay.id {
            return Err(BillingError::InvariantViolation(format!(
                "payment {} does not belong to stay {}",
                payment.id, stay.id
            )));
        }
        if self.contains(CF_STAYS, stay.id)? || self.contains(CF_PAYMENT_BY_STAY, stay.id)? {
            return Err(BillingError::InvariantViolation(format!(
                "stay {} is already booked",
                stay.id
            )));
        }

        let mut batch = WriteBatch::default();
        self.batch_put(&mut batch, CF_STAYS, stay.id, &stay)?;
        batch.put_cf(self.cf(CF_DOG_STAYS)?, dog_stay_key(stay.dog_id, stay.id), b"");
        self.batch_put(&mut batch, CF_PAYMENTS, payment.id, &payment)?;
        self.batch_put(&mut batch, CF_PAYMENT_BY_STAY, stay.id, &payment.id)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn commit_stay_update(&self, stay: Stay, payment: Option<Payment>) -> Result<()> {
        let _guard = self.writer.lock().await;
        if !self.contains(CF_STAYS, stay.id)? {
            return Err(BillingError::not_found("stay", stay.id));
        }

        let mut batch = WriteBatch::default();
        if let Some(payment) = &payment {
            if self.get::<PaymentId>(CF_PAYMENT_BY_STAY, stay.id)? != Some(payment.id) {
                return Err(BillingError::InvariantViolation(format!(
                    "payment {} does not belong to stay {}",
                    payment.id, stay.id
                )));
            }
            self.batch_put(&mut batch, CF_PAYMENTS, payment.id, payment)?;
        }
        self.batch_put(&mut batch, CF_STAYS, stay.id, &stay)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn commit_match(&self, transfer: BankTransfer, payment: Payment) -> Result<()> {
        let _guard = self.writer.lock().await;
        match self.get::<BankTransfer>(CF_TRANSFERS, transfer.id)? {
            Some(stored) if stored.is_matched() => {
                return Err(BillingError::InvariantViolation(format!(
                    "transfer {} is already matched",
                    transfer.id
                )));
            }
            Some(_) => {}
            None => return Err(BillingError::not_found("transfer", transfer.id)),
        }
        if transfer.matched_payment_id != Some(payment.id) {
            return Err(BillingError::InvariantViolation(format!(
                "transfer {} is not matched to payment {}",
                transfer.id, payment.id
            )));
        }
        if !self.contains(CF_PAYMENTS, payment.id)? {
            return Err(BillingError::not_found("payment", payment.id));
        }

        let mut batch = WriteBatch::default();
        self.batch_put(&mut batch, CF_PAYMENTS, payment.id, &payment)?;
        self.batch_put(&mut batch, CF_TRANSFERS, transfer.id, &transfer)?;
        self.db.write(batch)?;
        Ok(())
    }
}
