//! Durable token store: a single JSON object mapping hashed tokens to
//! usernames.
//!
//! Every operation is one critical section (read the full file, parse,
//! mutate, rewrite with truncation) behind an in-process mutex, so
//! concurrent writers cannot interleave partial updates and readers only
//! ever observe a pre- or post-mutation state. The file is assumed to be
//! owned exclusively by this process; the privileged scripts never touch
//! it.
//!
//! Startup distinguishes two fatal conditions: a missing file means the
//! gateway was never set up, a blank file means the store is broken. Both
//! refuse service, with distinct exit codes.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// File-backed hashed-token → username map.
pub struct TokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TokenStore {
    /// Open an existing store, enforcing the startup invariants:
    /// missing file → [`Error::StoreNotSetUp`], blank file →
    /// [`Error::StoreBlank`], unparsable content → [`Error::StoreCorrupt`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::StoreNotSetUp);
        }
        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Err(Error::StoreBlank);
        }
        serde_json::from_str::<HashMap<String, String>>(&contents).map_err(Error::StoreCorrupt)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Create an empty store file (`{}`) when none exists. Returns true
    /// if a file was created. Setup-mode only; `serve` never creates the
    /// store implicitly.
    pub fn create_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, "{}")?;
        Ok(true)
    }

    /// Resolve a hashed token to its username. An absent token is `None`,
    /// never an error.
    pub fn lookup(&self, token: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let records = self.read_all()?;
        Ok(records.get(token).cloned())
    }

    /// Insert or replace the record for `token`. Last write wins.
    pub fn insert(&self, token: &str, username: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        records.insert(token.to_string(), username.to_string());
        self.write_all(&records)
    }

    /// Remove every record whose username is in `usernames`, in a single
    /// read-modify-write transaction. Returns the number removed.
    pub fn purge_by_usernames(&self, usernames: &HashSet<String>) -> Result<usize> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        let before = records.len();
        records.retain(|_, username| !usernames.contains(username));
        let removed = before - records.len();
        self.write_all(&records)?;
        Ok(removed)
    }

    /// Number of live records. Test and diagnostics helper.
    pub fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // Callers must hold `self.lock`.
    fn read_all(&self) -> Result<HashMap<String, String>> {
        let contents = std::fs::read_to_string(&self.path)?;
        // A store that goes blank after startup is corruption, not an
        // empty map.
        if contents.trim().is_empty() {
            return Err(Error::StoreBlank);
        }
        serde_json::from_str(&contents).map_err(Error::StoreCorrupt)
    }

    fn write_all(&self, records: &HashMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string(records).map_err(Error::StoreCorrupt)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}
