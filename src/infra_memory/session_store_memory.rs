use crate::domain_model::SessionKey;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local session store with TTLs driven by a [`Clock`].
///
/// A batch is applied under one write lock, so readers never observe part of it.
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    round_trips: AtomicUsize,
    fail_batches: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            round_trips: AtomicUsize::new(0),
            fail_batches: AtomicBool::new(false),
        }
    }

    /// Number of store calls served so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Make every following `batch` fail without applying anything.
    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    /// Number of entries held, expired ones included until the next write sweeps them.
    pub fn stored_entries(&self) -> usize {
        self.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Remaining lifetime of a live key, if any.
    pub fn ttl_of(&self, key: &SessionKey) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.read().ok()?;
        entries
            .get(&key.to_string())
            .filter(|e| e.expires_at > now)
            .and_then(|e| (e.expires_at - now).to_std().ok())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn sweep(entries: &mut HashMap<String, Entry>, now: DateTime<Utc>) {
        entries.retain(|_, e| e.expires_at > now);
    }

    fn tick(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }

    fn entry(&self, value: &str, ttl: Duration) -> Entry {
        Entry {
            value: value.to_string(),
            expires_at: self.clock.now() + ttl,
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put_with_ttl(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.tick();
        let entry = self.entry(value, ttl);
        self.write()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.tick();
        let now = self.clock.now();
        let entry = self.entry(value, ttl);
        let mut entries = self.write()?;
        Self::sweep(&mut entries, now);
        match entries.get(&key.to_string()) {
            Some(_) => Ok(false),
            None => {
                entries.insert(key.to_string(), entry);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.tick();
        self.write()?.remove(&key.to_string());
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, StoreError> {
        self.tick();
        let now = self.clock.now();
        Ok(self
            .read()?
            .get(&key.to_string())
            .is_some_and(|e| e.expires_at > now))
    }

    async fn batch(&self, ops: Vec<StoreOp>) -> Result<(), StoreError> {
        self.tick();
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("batch rejected".to_string()));
        }

        let mut entries = self.write()?;
        Self::sweep(&mut entries, self.clock.now());
        for op in ops {
            match op {
                StoreOp::Put { key, value, ttl } => {
                    let entry = self.entry(&value, ttl);
                    entries.insert(key.to_string(), entry);
                }
                StoreOp::Delete { key } => {
                    entries.remove(&key.to_string());
                }
            }
        }
        Ok(())
    }
}
