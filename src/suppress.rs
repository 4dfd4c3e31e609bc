//! Full-request suppression.
//!
//! A Metadata request that covers the whole cluster (all topics, or
//! brokers-only) is expensive enough, and frequent enough to be triggered
//! redundantly by several callers at once, that the engine caps each of
//! its two full-request shapes to one in flight at a time —
//! `full_topics_inflight` and `full_brokers_inflight`, mirroring the two
//! ways `MetadataRequest::is_full_request` can be true. A second unforced
//! request of the same shape while one is outstanding is rejected with
//! `PrevInProgress` rather than sent; a forced request always bypasses the
//! cap. OffsetFetch and OffsetCommit have their own skip-if-no-work
//! short-circuit (`OffsetFetchRequest`/`OffsetCommitRequest::filtered`) —
//! a different mechanism entirely, since there's nothing to suppress when
//! the filtered set is simply empty. Counters are process-wide and
//! guarded by a mutex rather than confined to a single executor, since
//! callers may come from more than one thread.

use std::sync::{Condvar, Mutex};

use errors::{ErrorKind, Result};

/// The two full-cluster Metadata request shapes this engine suppresses
/// duplicates of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullRequestKind {
    /// `MetadataRequest { topics: None }` — every topic in the cluster.
    Topics,
    /// `MetadataRequest { topics: Some(vec![]) }` on `v >= 1` — brokers only.
    Brokers,
}

const KIND_COUNT: usize = 2;

fn index(kind: FullRequestKind) -> usize {
    match kind {
        FullRequestKind::Topics => 0,
        FullRequestKind::Brokers => 1,
    }
}

/// An RAII guard returned by `FullRequestSuppressor::begin`. Dropping it
/// (whether the request succeeded, failed, or panicked) releases the slot
/// and wakes any thread blocked in `wait_until_clear`.
pub struct Permit<'a> {
    suppressor: &'a FullRequestSuppressor,
    kind: FullRequestKind,
}

impl<'a> Drop for Permit<'a> {
    fn drop(&mut self) {
        self.suppressor.end(self.kind);
    }
}

pub struct FullRequestSuppressor {
    counts: Mutex<[u32; KIND_COUNT]>,
    idle: Condvar,
}

impl FullRequestSuppressor {
    pub fn new() -> FullRequestSuppressor {
        FullRequestSuppressor {
            counts: Mutex::new([0; KIND_COUNT]),
            idle: Condvar::new(),
        }
    }

    /// Begins a request of `kind`. Unless `force` is set, fails with
    /// `PrevInProgress` if one of the same kind is already outstanding.
    pub fn begin(&self, kind: FullRequestKind, force: bool) -> Result<Permit> {
        let mut counts = self.counts.lock().unwrap();
        let i = index(kind);

        if counts[i] > 0 && !force {
            bail!(ErrorKind::PrevInProgress);
        }

        counts[i] += 1;
        Ok(Permit { suppressor: self, kind: kind })
    }

    fn end(&self, kind: FullRequestKind) {
        let mut counts = self.counts.lock().unwrap();
        let i = index(kind);
        debug_assert!(counts[i] > 0);
        counts[i] = counts[i].saturating_sub(1);
        if counts[i] == 0 {
            self.idle.notify_all();
        }
    }

    /// Blocks the calling thread until no request of `kind` is in flight.
    /// Used by callers that would rather wait their turn than be rejected.
    pub fn wait_until_clear(&self, kind: FullRequestKind) {
        let i = index(kind);
        let mut guard = self.counts.lock().unwrap();
        while guard[i] > 0 {
            guard = self.idle.wait(guard).unwrap();
        }
    }
}
