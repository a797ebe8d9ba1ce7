use crate::domain::directory::DogId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes every read-modify-write of payment rows.
pub type PaymentLock = Arc<AsyncMutex<()>>;

/// One async lock per dog, held across the overlap check and the stay write.
///
/// Two bookings for the same dog queue up behind each other; bookings for
/// different dogs proceed in parallel.
#[derive(Default)]
pub struct DogLocks {
    locks: Mutex<HashMap<DogId, Arc<AsyncMutex<()>>>>,
}

impl DogLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, dog_id: DogId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(dog_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_dog_is_exclusive() {
        let locks = Arc::new(DogLocks::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // a different dog is not blocked
        let _other = locks.lock(2).await;

        drop(guard);
        contender.await.unwrap();
    }
}
