//! In-memory registry of background jobs.
//!
//! Video import and snippet extraction take minutes, so handlers register a
//! job, spawn the work on the Tokio runtime and return immediately. The UI
//! polls `/api/v1/jobs/{id}` for status and progress.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lpa_core::progress::ProgressSink;
use serde::Serialize;
use uuid::Uuid;

/// Poll interval used while waiting for jobs to drain.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Finished jobs kept for polling; older ones are evicted first.
pub const DEFAULT_MAX_FINISHED_JOBS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Snapshot of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: String,
    pub project: String,
    pub status: JobStatus,
    /// Percent complete, `0.0..=100.0`.
    pub progress: f64,
    /// Failure reason for failed jobs.
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    max_finished: usize,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_MAX_FINISHED_JOBS)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry keeping at most `max_finished` completed or failed jobs.
    /// Queued and running jobs are never evicted.
    pub fn with_retention(max_finished: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            max_finished,
        }
    }

    /// Register a queued job.
    pub fn create(&self, kind: &str, project: &str) -> JobRecord {
        let record = JobRecord {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            project: project.to_string(),
            status: JobStatus::Queued,
            progress: 0.0,
            message: None,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.write().insert(record.id, record.clone());
        record
    }

    pub fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.read().get(&id).cloned()
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<_> = self.read().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Number of jobs not yet completed or failed.
    pub fn active_count(&self) -> usize {
        self.read()
            .values()
            .filter(|j| !j.status.is_finished())
            .count()
    }

    pub fn set_running(&self, id: Uuid) {
        self.update(id, |job| job.status = JobStatus::Running);
    }

    pub fn set_progress(&self, id: Uuid, progress: f64) {
        self.update(id, |job| {
            if !job.status.is_finished() {
                job.progress = progress.clamp(0.0, 100.0);
            }
        });
    }

    pub fn complete(&self, id: Uuid, result: serde_json::Value) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100.0;
            job.result = Some(result);
            job.finished_at = Some(Utc::now());
        });
        self.evict_finished();
    }

    pub fn fail(&self, id: Uuid, message: String) {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.message = Some(message);
            job.finished_at = Some(Utc::now());
        });
        self.evict_finished();
    }

    /// Register a job and run `work` on the Tokio runtime.
    ///
    /// `work` receives a [`JobProgress`] sink bound to the new job. Its
    /// `Ok` value becomes the job result, its `Err` the failure message.
    pub fn spawn<F, Fut>(self: &Arc<Self>, kind: &str, project: &str, work: F) -> JobRecord
    where
        F: FnOnce(JobProgress) -> Fut,
        Fut: Future<Output = Result<serde_json::Value, String>> + Send + 'static,
    {
        let record = self.create(kind, project);
        let id = record.id;
        let fut = work(JobProgress {
            registry: Arc::clone(self),
            id,
        });

        let registry = Arc::clone(self);
        let kind = kind.to_string();
        tokio::spawn(async move {
            registry.set_running(id);
            tracing::info!(job_id = %id, kind = %kind, "Job started");
            match fut.await {
                Ok(result) => {
                    registry.complete(id, result);
                    tracing::info!(job_id = %id, kind = %kind, "Job completed");
                }
                Err(message) => {
                    tracing::error!(job_id = %id, kind = %kind, error = %message, "Job failed");
                    registry.fail(id, message);
                }
            }
        });

        record
    }

    /// Wait until no job is active or `timeout` elapses.
    ///
    /// Returns the number of jobs still active.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let active = self.active_count();
            if active == 0 || tokio::time::Instant::now() >= deadline {
                return active;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Drop the oldest finished jobs beyond the retention limit.
    fn evict_finished(&self) {
        let mut jobs = self.write();
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
            .values()
            .filter_map(|j| j.finished_at.map(|at| (at, j.id)))
            .collect();
        if finished.len() <= self.max_finished {
            return;
        }
        finished.sort();
        let excess = finished.len() - self.max_finished;
        for (_, id) in finished.into_iter().take(excess) {
            jobs.remove(&id);
        }
        tracing::debug!(evicted = excess, "Evicted finished jobs");
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut JobRecord)) {
        if let Some(job) = self.write().get_mut(&id) {
            f(job);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, JobRecord>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, JobRecord>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Progress sink that writes into one job's record.
#[derive(Clone)]
pub struct JobProgress {
    registry: Arc<JobRegistry>,
    id: Uuid,
}

impl JobProgress {
    pub fn job_id(&self) -> Uuid {
        self.id
    }
}

impl ProgressSink for JobProgress {
    fn report(&self, percent: f64) {
        self.registry.set_progress(self.id, percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_completed() {
        let registry = JobRegistry::new();
        let id = registry.create("snippet", "mouse").id;
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Queued);
        assert_eq!(registry.active_count(), 1);

        registry.set_running(id);
        registry.set_progress(id, 42.0);
        assert_eq!(registry.get(id).unwrap().progress, 42.0);

        registry.complete(id, serde_json::json!({"ok": true}));
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert!(job.finished_at.is_some());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn progress_ignored_after_failure() {
        let registry = JobRegistry::new();
        let id = registry.create("import", "mouse").id;
        registry.fail(id, "boom".into());
        registry.set_progress(id, 80.0);
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0.0);
        assert_eq!(job.message.as_deref(), Some("boom"));
    }

    #[test]
    fn oldest_finished_jobs_are_evicted() {
        let registry = JobRegistry::with_retention(2);
        let running = registry.create("snippet", "mouse").id;
        registry.set_running(running);

        let ids: Vec<Uuid> = (0..3).map(|_| registry.create("import", "mouse").id).collect();
        for id in &ids {
            registry.complete(*id, serde_json::Value::Null);
            std::thread::sleep(Duration::from_millis(2));
        }

        assert!(registry.get(ids[0]).is_none());
        assert!(registry.get(ids[1]).is_some());
        assert!(registry.get(ids[2]).is_some());
        assert_eq!(registry.get(running).unwrap().status, JobStatus::Running);
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn unknown_job_is_none() {
        assert!(JobRegistry::new().get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn spawned_job_reports_progress_and_result() {
        let registry = Arc::new(JobRegistry::new());
        let record = registry.spawn("snippet", "mouse", |progress| async move {
            progress.report(50.0);
            Ok(serde_json::json!({"path": "a.short.mp4"}))
        });
        assert_eq!(record.status, JobStatus::Queued);

        assert_eq!(registry.drain(Duration::from_secs(5)).await, 0);
        let job = registry.get(record.id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap()["path"], "a.short.mp4");
    }

    #[tokio::test]
    async fn spawned_job_error_marks_failed() {
        let registry = Arc::new(JobRegistry::new());
        let record = registry.spawn("import", "mouse", |_| async move {
            Err("ffmpeg not installed".to_string())
        });
        registry.drain(Duration::from_secs(5)).await;
        let job = registry.get(record.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message.as_deref(), Some("ffmpeg not installed"));
    }
}
