use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dream_entry::{DreamEntry, DreamInput};
use crate::stats::{self, DreamStats};
use crate::storage::{BlobStorage, StorageError};

/// Name of the blob holding the journal when users are not isolated.
pub const DEFAULT_KEY: &str = "dreams";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no dream with id {0}")]
    NotFound(u64),
    #[error("no dream ids left after {0}")]
    IdsExhausted(u64),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Blob key for a journal, optionally scoped to one signed-in user.
///
/// Emails are lowercased; ASCII letters and digits are kept and every other
/// byte becomes `_xx` hex, so distinct addresses never share a key.
pub fn storage_key(user_email: Option<&str>) -> String {
    match user_email {
        Some(email) => {
            let mut scoped = String::with_capacity(email.len());
            for byte in email.to_lowercase().bytes() {
                if byte.is_ascii_alphanumeric() {
                    scoped.push(char::from(byte));
                } else {
                    scoped.push_str(&format!("_{byte:02x}"));
                }
            }
            format!("{DEFAULT_KEY}-{scoped}")
        }
        None => DEFAULT_KEY.to_string(),
    }
}

/// The journal: entries in creation order, mirrored to one storage blob.
///
/// Every mutation rewrites the whole blob. The in-memory collection stays
/// authoritative even if that write fails.
pub struct DreamStore<S> {
    storage: S,
    key: String,
    entries: Vec<DreamEntry>,
}

impl<S: BlobStorage> DreamStore<S> {
    /// Loads the journal stored under `key`. Missing or unreadable data
    /// yields an empty journal.
    pub fn load(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let entries = match storage.read(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<DreamEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding malformed dream journal");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "could not read dream journal");
                Vec::new()
            }
        };
        debug!(key = %key, count = entries.len(), "loaded dream journal");

        DreamStore {
            storage,
            key,
            entries,
        }
    }

    pub fn create(&mut self, input: DreamInput) -> Result<DreamEntry, StoreError> {
        self.create_at(input, Utc::now())
    }

    pub fn create_at(
        &mut self,
        input: DreamInput,
        now: DateTime<Utc>,
    ) -> Result<DreamEntry, StoreError> {
        let entry = DreamEntry::new(self.next_id(now)?, input);
        self.entries.push(entry.clone());
        self.save()?;
        debug!(id = entry.id, "created dream");
        Ok(entry)
    }

    pub fn update(&mut self, id: u64, input: DreamInput) -> Result<DreamEntry, StoreError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.apply(input);
        let updated = entry.clone();
        self.save()?;
        debug!(id, "updated dream");
        Ok(updated)
    }

    /// Deleting an id that is already gone is not an error.
    pub fn remove(&mut self, id: u64) -> Result<(), StoreError> {
        self.entries.retain(|e| e.id != id);
        self.save()?;
        debug!(id, "removed dream");
        Ok(())
    }

    /// Most recent first.
    pub fn list(&self) -> Vec<&DreamEntry> {
        self.entries.iter().rev().collect()
    }

    /// Creation order, oldest first.
    pub fn entries(&self) -> &[DreamEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&DreamEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DreamStats {
        stats::stats(&self.entries, now)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn save(&self) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(&self.entries).map_err(StorageError::from)?;
        self.storage.write(&self.key, &serialized)?;
        Ok(())
    }

    // Millisecond timestamp, bumped past the largest existing id so two
    // creations inside one clock tick still get distinct ids.
    fn next_id(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        match self.entries.iter().map(|e| e.id).max() {
            Some(max) if max >= millis => {
                max.checked_add(1).ok_or(StoreError::IdsExhausted(max))
            }
            _ => Ok(millis),
        }
    }
}
