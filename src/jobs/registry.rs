use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::record::{JobId, JobKind, JobRecord, JobSnapshot};

/// In-memory store of every job created during the process lifetime
///
/// One mutex covers the whole map, so a reader never sees a half-applied
/// update and a cancel flag set by [`JobRegistry::request_cancel`] is visible
/// to the very next progress callback. Records are never evicted.
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, JobRecord>,
    /// Insertion order for listings
    order: Vec<JobId>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `pending` record
    pub fn create(&self, kind: JobKind, url: impl Into<String>) -> JobSnapshot {
        let record = JobRecord::new(kind, url.into());
        let snapshot = record.snapshot();

        let mut inner = self.lock();
        inner.order.push(record.id());
        inner.jobs.insert(record.id(), record);
        drop(inner);

        info!(job_id = %snapshot.job_id, kind = ?snapshot.kind, url = %snapshot.url, "Job created");
        snapshot
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.lock().jobs.get(id).map(JobRecord::snapshot)
    }

    /// Copies of all records in creation order
    pub fn list(&self) -> Vec<JobSnapshot> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .map(JobRecord::snapshot)
            .collect()
    }

    /// Flag a job for cancellation; returns whether the job exists
    ///
    /// This only signals. A running job keeps its status until its runner
    /// sees the flag; a pending job is cancelled immediately.
    pub fn request_cancel(&self, id: &JobId) -> bool {
        let found = self
            .with_record(id, |record| {
                record.request_cancel();
                record.status()
            })
            .inspect(|status| debug!(job_id = %id, %status, "Cancellation requested"));

        found.is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against a record while holding the registry lock
    pub(crate) fn with_record<R>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut JobRecord) -> R,
    ) -> Option<R> {
        self.lock().jobs.get_mut(id).map(f)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Records stay consistent between statements, so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
