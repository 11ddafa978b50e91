#![forbid(unsafe_code)]

//! Inventory fetch lifecycle.
//!
//! [`SyncController`] decides when a fetch starts and what its result does
//! to the screen's collection. It does no I/O itself: [`begin`] hands out a
//! [`FetchTicket`], the caller runs the fetch as a background task, and the
//! result comes back through [`complete`].
//!
//! # Invariants
//!
//! - `fetching()` is true exactly while at least one ticket is outstanding.
//! - `records()` changes only on a successful completion, and is replaced
//!   wholesale. With overlapping fetches the last *completion* wins.
//! - After [`detach`], every completion is discarded.
//!
//! [`begin`]: SyncController::begin
//! [`complete`]: SyncController::complete
//! [`detach`]: SyncController::detach

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use stockview_core::{InventoryCollection, RawRecord};

use crate::source::FetchResult;

/// What started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    /// The screen gained navigation focus.
    Activated,
    PullToRefresh,
}

impl FetchTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::PullToRefresh => "pull_to_refresh",
        }
    }
}

/// How a trigger behaves while a fetch is already outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Every trigger issues its own fetch.
    #[default]
    Overlap,
    /// A trigger joins the outstanding fetch instead of issuing another.
    Coalesce,
}

impl FetchPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overlap" => Some(Self::Overlap),
            "coalesce" => Some(Self::Coalesce),
            _ => None,
        }
    }
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Effect of one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The collection was replaced with `len` records.
    Replaced { len: usize },
    /// The fetch failed; the collection is unchanged.
    Failed,
    /// The completion was stale (unknown ticket or detached controller).
    Discarded,
}

/// Owns `{ fetching, records }` for one screen.
#[derive(Debug)]
pub struct SyncController {
    policy: FetchPolicy,
    records: InventoryCollection,
    outstanding: BTreeSet<FetchTicket>,
    next_ticket: u64,
    detached: bool,
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

impl SyncController {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            policy,
            records: Arc::from(Vec::new()),
            outstanding: BTreeSet::new(),
            next_ticket: 0,
            detached: false,
        }
    }

    /// The screen was (re)activated. Always asks for a fetch.
    pub fn notify_activated(&mut self) -> Option<FetchTicket> {
        self.begin(FetchTrigger::Activated)
    }

    pub fn on_pull_to_refresh(&mut self) -> Option<FetchTicket> {
        self.begin(FetchTrigger::PullToRefresh)
    }

    /// Start a fetch. Returns `None` when no new fetch should be issued:
    /// the controller is detached, or the policy coalesces into one that is
    /// already outstanding.
    pub fn begin(&mut self, trigger: FetchTrigger) -> Option<FetchTicket> {
        if self.detached {
            tracing::trace!(trigger = trigger.as_str(), "fetch ignored after teardown");
            return None;
        }
        if self.policy == FetchPolicy::Coalesce && !self.outstanding.is_empty() {
            tracing::debug!(
                trigger = trigger.as_str(),
                in_flight = self.outstanding.len(),
                "fetch coalesced into outstanding request"
            );
            return None;
        }
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.outstanding.insert(ticket);
        tracing::debug!(
            ticket = ticket.get(),
            trigger = trigger.as_str(),
            in_flight = self.outstanding.len(),
            "fetch started"
        );
        Some(ticket)
    }

    /// Apply the result of `ticket`.
    pub fn complete(&mut self, ticket: FetchTicket, result: FetchResult) -> SyncOutcome {
        if self.detached {
            tracing::trace!(ticket = ticket.get(), "fetch result discarded after teardown");
            return SyncOutcome::Discarded;
        }
        if !self.outstanding.remove(&ticket) {
            tracing::trace!(ticket = ticket.get(), "fetch result for unknown ticket discarded");
            return SyncOutcome::Discarded;
        }
        let in_flight = self.outstanding.len();
        match result {
            Ok(records) => {
                warn_duplicate_ids(&records);
                let len = records.len();
                self.records = Arc::from(records);
                tracing::debug!(ticket = ticket.get(), in_flight, records = len, "fetch succeeded");
                SyncOutcome::Replaced { len }
            }
            Err(err) => {
                tracing::warn!(
                    ticket = ticket.get(),
                    in_flight,
                    error = %err,
                    "fetch failed; keeping previous inventory"
                );
                SyncOutcome::Failed
            }
        }
    }

    /// Stop accepting work. Outstanding tickets are forgotten.
    pub fn detach(&mut self) {
        if !self.detached {
            tracing::debug!(abandoned = self.outstanding.len(), "sync controller detached");
        }
        self.detached = true;
        self.outstanding.clear();
    }

    #[inline]
    pub fn fetching(&self) -> bool {
        !self.outstanding.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &InventoryCollection {
        &self.records
    }

    /// Outstanding fetches.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

fn warn_duplicate_ids(records: &[RawRecord]) {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(&record.id) {
            tracing::warn!(record_id = %record.id, "duplicate record id in inventory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn records(ids: &[&str]) -> FetchResult {
        Ok(ids.iter().map(|id| RawRecord::new(*id)).collect())
    }

    fn ids(sync: &SyncController) -> Vec<&str> {
        sync.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn starts_empty_and_idle() {
        let sync = SyncController::default();
        assert!(!sync.fetching());
        assert!(sync.records().is_empty());
        assert_eq!(sync.policy(), FetchPolicy::Overlap);
    }

    #[test]
    fn success_replaces_records() {
        let mut sync = SyncController::default();
        let t = sync.notify_activated().unwrap();
        assert!(sync.fetching());
        assert_eq!(sync.complete(t, records(&["a", "b"])), SyncOutcome::Replaced { len: 2 });
        assert!(!sync.fetching());
        assert_eq!(ids(&sync), ["a", "b"]);
    }

    #[test]
    fn failure_keeps_records_and_clears_flag() {
        let mut sync = SyncController::default();
        let t = sync.notify_activated().unwrap();
        sync.complete(t, records(&["a"]));
        let t = sync.on_pull_to_refresh().unwrap();
        let outcome = sync.complete(t, Err(FetchError::source_error("offline")));
        assert_eq!(outcome, SyncOutcome::Failed);
        assert!(!sync.fetching());
        assert_eq!(ids(&sync), ["a"]);
    }

    #[test]
    fn last_completion_wins() {
        let mut sync = SyncController::default();
        let first = sync.notify_activated().unwrap();
        let second = sync.on_pull_to_refresh().unwrap();
        assert_eq!(sync.in_flight(), 2);

        sync.complete(second, records(&["new"]));
        assert!(sync.fetching());
        sync.complete(first, records(&["old"]));
        assert!(!sync.fetching());
        assert_eq!(ids(&sync), ["old"]);
    }

    #[test]
    fn flag_stays_up_until_last_outstanding() {
        let mut sync = SyncController::default();
        let a = sync.notify_activated().unwrap();
        let b = sync.notify_activated().unwrap();
        let c = sync.on_pull_to_refresh().unwrap();
        sync.complete(b, Err(FetchError::source_error("x")));
        sync.complete(a, records(&["a"]));
        assert!(sync.fetching());
        sync.complete(c, Err(FetchError::source_error("y")));
        assert!(!sync.fetching());
        assert_eq!(ids(&sync), ["a"]);
    }

    #[test]
    fn unknown_ticket_is_discarded() {
        let mut sync = SyncController::default();
        let t = sync.notify_activated().unwrap();
        sync.complete(t, records(&["a"]));
        assert_eq!(sync.complete(t, records(&["b"])), SyncOutcome::Discarded);
        assert_eq!(ids(&sync), ["a"]);
    }

    #[test]
    fn coalesce_joins_outstanding_fetch() {
        let mut sync = SyncController::new(FetchPolicy::Coalesce);
        let t = sync.notify_activated().unwrap();
        assert!(sync.on_pull_to_refresh().is_none());
        assert_eq!(sync.in_flight(), 1);
        sync.complete(t, records(&["a"]));
        assert!(sync.on_pull_to_refresh().is_some());
    }

    #[test]
    fn detached_controller_discards_everything() {
        let mut sync = SyncController::default();
        let t = sync.notify_activated().unwrap();
        sync.detach();
        assert!(!sync.fetching());
        assert_eq!(sync.complete(t, records(&["a"])), SyncOutcome::Discarded);
        assert!(sync.records().is_empty());
        assert!(sync.notify_activated().is_none());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(FetchPolicy::parse(" Coalesce "), Some(FetchPolicy::Coalesce));
        assert_eq!(FetchPolicy::parse("overlap"), Some(FetchPolicy::Overlap));
        assert_eq!(FetchPolicy::parse("merge"), None);
    }
}
