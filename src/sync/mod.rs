//! Parallel synchronization of module checkouts
//!
//! Every declared module becomes one job. Jobs carry their own handles and
//! return their own issues and refreshed metadata; the registry is only
//! touched again after all workers have joined.

use crate::parallel::ExecutionStrategy;
use crate::registry::{Registry, Status};
use crate::vcs::{CacheHandle, RepoHandle};
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A module that was left alone during checkout, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncIssue {
    pub module: String,
    pub reason: String,
}

impl SyncIssue {
    pub fn new(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: skipped - {}", self.module, self.reason)
    }
}

struct Job {
    index: usize,
    name: String,
    path: PathBuf,
    desired_ref: String,
    status: Status,
    repo: Arc<dyn RepoHandle>,
    cache: Arc<dyn CacheHandle>,
}

#[derive(Default)]
struct Outcome {
    issues: Vec<SyncIssue>,
    /// Metadata read back after a successful sync
    refreshed: Option<(Option<String>, Option<String>)>,
}

pub struct SyncDriver {
    strategy: ExecutionStrategy,
}

impl SyncDriver {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self { strategy }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self::new(ExecutionStrategy::for_workers(workers))
    }

    /// Synchronize every Known module and report the ones that were skipped.
    pub fn checkout(&self, registry: &mut Registry) -> Result<Vec<SyncIssue>> {
        self.checkout_with_progress(registry, None::<fn(usize, usize, usize)>)
    }

    /// Like [`checkout`](Self::checkout), calling `progress(done, total, worker)`
    /// as modules finish.
    pub fn checkout_with_progress<P>(&self, registry: &mut Registry, progress: Option<P>) -> Result<Vec<SyncIssue>>
    where
        P: Fn(usize, usize, usize) + Sync,
    {
        let jobs = jobs(registry);
        tracing::info!("Synchronizing {} modules", jobs.len());

        let indices: Vec<usize> = jobs.iter().map(|job| job.index).collect();
        let outcomes = self.strategy.execute(jobs, |job, _worker_id| sync_module(job), progress)?;

        let mut issues = Vec::new();
        let modules = registry.modules_mut();
        for (index, outcome) in indices.into_iter().zip(outcomes) {
            if let Some((origin, head)) = outcome.refreshed {
                let module = &mut modules[index];
                if origin.is_some() {
                    module.origin = origin;
                }
                module.head = head;
            }
            issues.extend(outcome.issues);
        }

        if !issues.is_empty() {
            tracing::warn!("{} modules were skipped", issues.len());
        }
        Ok(issues)
    }
}

/// Known and Dirty modules with handles attached. Unknown modules have none.
fn jobs(registry: &Registry) -> Vec<Job> {
    registry
        .modules()
        .iter()
        .enumerate()
        .filter(|(_, m)| matches!(m.status, Status::Known | Status::Dirty(_)))
        .filter_map(|(index, m)| {
            Some(Job {
                index,
                name: m.name.clone(),
                path: m.path.clone(),
                desired_ref: m.desired_ref.clone()?,
                status: m.status.clone(),
                repo: m.repo.clone()?,
                cache: m.cache.clone()?,
            })
        })
        .collect()
}

fn sync_module(job: &Job) -> Outcome {
    let skip = |reason: String| {
        tracing::warn!("Skipping {}: {}", job.name, reason);
        Outcome {
            issues: vec![SyncIssue::new(&job.name, reason)],
            refreshed: None,
        }
    };

    if let Err(e) = std::fs::create_dir_all(&job.path) {
        return skip(format!("could not create {}: {}", job.path.display(), e));
    }

    let state = match job.repo.sync_state(&job.desired_ref) {
        Ok(state) => state,
        Err(e) => return skip(format!("unknown repository state ({e})")),
    };
    tracing::debug!("{} is {} relative to {}", job.name, state, job.desired_ref);

    if !job.cache.is_fresh()
        && let Err(e) = job.cache.sync()
        && !job.cache.is_fresh()
    {
        return skip(format!("could not synchronize cache for {}: {:#}", job.cache.remote(), e));
    }

    match &job.status {
        Status::Known => match job.repo.sync(&job.desired_ref) {
            Ok(()) => Outcome {
                issues: Vec::new(),
                refreshed: Some((
                    job.repo.origin().ok().flatten(),
                    job.repo.head().ok().flatten(),
                )),
            },
            Err(e) => skip(format!("could not check out {}: {:#}", job.desired_ref, e)),
        },
        Status::Dirty(reason) => skip(reason.clone()),
        other => skip(format!("unexpected status {other}")),
    }
}
