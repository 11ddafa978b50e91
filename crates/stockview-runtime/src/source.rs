//! Inventory data sources.
//!
//! The screen only sees [`InventorySource::list_inventory`], a blocking call
//! that returns the whole current collection. It runs on a task thread.
//! Transport, auth and pagination live behind this trait.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use stockview_core::RawRecord;

use crate::error::FetchError;

/// Outcome of one fetch.
pub type FetchResult = Result<Vec<RawRecord>, FetchError>;

/// A remote (or local) inventory store.
pub trait InventorySource: Send + Sync {
    /// Fetch the full current collection, in source order.
    fn list_inventory(&self) -> FetchResult;
}

impl<F> InventorySource for F
where
    F: Fn() -> FetchResult + Send + Sync,
{
    fn list_inventory(&self) -> FetchResult {
        self()
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Canned {
    Records(Vec<RawRecord>),
    Failure(String),
}

/// In-memory source whose response can be swapped at any time.
#[derive(Debug)]
pub struct StaticSource {
    canned: Mutex<Canned>,
    calls: Mutex<usize>,
}

impl StaticSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            canned: Mutex::new(Canned::Records(records)),
            calls: Mutex::new(0),
        }
    }

    /// A source that fails every fetch with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            canned: Mutex::new(Canned::Failure(message.into())),
            calls: Mutex::new(0),
        }
    }

    /// Serve `records` from now on.
    pub fn set_records(&self, records: Vec<RawRecord>) {
        *self.canned.lock().unwrap_or_else(PoisonError::into_inner) = Canned::Records(records);
    }

    /// Fail every fetch from now on.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.canned.lock().unwrap_or_else(PoisonError::into_inner) =
            Canned::Failure(message.into());
    }

    /// Fetches served so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InventorySource for StaticSource {
    fn list_inventory(&self) -> FetchResult {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        match &*self.canned.lock().unwrap_or_else(PoisonError::into_inner) {
            Canned::Records(records) => Ok(records.clone()),
            Canned::Failure(message) => Err(FetchError::source_error(message.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// JsonFileSource
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Bare(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
}

/// Reads the collection from a JSON file on every fetch.
///
/// The file holds either an array of records or `{ "records": [...] }`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode an inventory payload.
pub fn parse_inventory(text: &str) -> FetchResult {
    Ok(match serde_json::from_str::<Payload>(text)? {
        Payload::Bare(records) | Payload::Wrapped { records } => records,
    })
}

impl InventorySource for JsonFileSource {
    fn list_inventory(&self) -> FetchResult {
        let text = fs::read_to_string(&self.path)?;
        let records = parse_inventory(&text)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "inventory file read");
        Ok(records)
    }
}
