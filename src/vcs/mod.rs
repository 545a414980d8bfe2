//! Version-control capability contracts
//!
//! The registry and the sync driver never talk to git directly. They work
//! against these traits, which the [`git`](crate::git) module implements on
//! top of the system git client. Tests substitute in-memory handles.

use crate::registry::Status;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Synchronization state of a checkout relative to its desired reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Nothing checked out yet
    Absent,
    /// Something is there, but not a checkout of the declared source
    Mismatched,
    /// Checkout of the right source at the wrong commit
    Outdated,
    InSync,
    /// Tracked files carry local modifications
    Dirty,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Absent => "absent",
            SyncState::Mismatched => "mismatched",
            SyncState::Outdated => "outdated",
            SyncState::InSync => "insync",
            SyncState::Dirty => "dirty",
        };
        f.write_str(name)
    }
}

/// Shared local object store for one source URL.
///
/// Several modules may hold the same handle. Two workers racing to sync it
/// must both end up with a usable cache.
pub trait CacheHandle: Send + Sync + fmt::Debug {
    fn remote(&self) -> &str;

    /// True once the cache has been synchronized during this run.
    fn is_fresh(&self) -> bool;

    fn sync(&self) -> Result<()>;
}

/// A module's checkout.
pub trait RepoHandle: Send + Sync + fmt::Debug {
    /// Commit id currently checked out, `None` when nothing is.
    fn head(&self) -> Result<Option<String>>;

    /// URL of the `origin` remote, `None` when there is no checkout.
    fn origin(&self) -> Result<Option<String>>;

    fn sync_state(&self, desired_ref: &str) -> Result<SyncState>;

    /// Bring the checkout to `desired_ref`.
    fn sync(&self, desired_ref: &str) -> Result<()>;
}

/// Factory for handles plus the working-tree classifier.
///
/// The registry deduplicates caches per source URL, so `cache` is called once
/// for each distinct remote.
pub trait Backend {
    type Cache: CacheHandle + 'static;

    fn cache(&self, remote: &str) -> Arc<Self::Cache>;

    fn repo(&self, path: &Path, remote: &str, cache: Arc<Self::Cache>) -> Arc<dyn RepoHandle>;

    fn classify(&self, path: &Path) -> Status;
}
