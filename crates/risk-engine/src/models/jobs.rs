use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ModelId, TenantId};

/// Which bulk pass a worker is running for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Test,
    Publish,
}

impl JobMode {
    pub const fn label(self) -> &'static str {
        match self {
            JobMode::Test => "test",
            JobMode::Publish => "publish",
        }
    }
}

/// Identity of one background run: the marker and lock file names derive
/// deterministically from (tenant, model, mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKey {
    pub tenant: TenantId,
    pub model: ModelId,
    pub mode: JobMode,
}

impl JobKey {
    pub fn new(tenant: TenantId, model: ModelId, mode: JobMode) -> Self {
        Self {
            tenant,
            model,
            mode,
        }
    }

    fn stem(&self) -> String {
        format!("{}-{}-{}", self.tenant.0, self.model.0, self.mode.label())
    }
}

/// Coordination failures around background runs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("acknowledgment wait exceeded {0} seconds; the worker may still complete")]
    AcknowledgmentTimeout(u64),
    #[error("worker spawn failed: {0}")]
    Spawn(String),
    #[error("job coordination failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockFile {
    pid: u32,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkerFile {
    started_at: Option<DateTime<Utc>>,
    finished_at: DateTime<Utc>,
}

/// Result of trying to claim a run slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    Started,
    /// A live worker already holds the slot; the caller observes that run
    /// instead of starting a second one.
    AlreadyRunning {
        pid: u32,
        started_at: DateTime<Utc>,
    },
}

/// Observed state of a run, derived from the lock and marker files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Complete,
}

/// Filesystem coordinator for detached test/publish workers.
///
/// A lock file records the owning process id while a run is live; the marker
/// file's existence signals completion. Both live in the configured work
/// directory under names derived from the job key.
#[derive(Debug, Clone)]
pub struct JobCoordinator {
    work_dir: PathBuf,
}

impl JobCoordinator {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn lock_path(&self, key: &JobKey) -> PathBuf {
        self.work_dir.join(format!("{}.lock", key.stem()))
    }

    fn marker_path(&self, key: &JobKey) -> PathBuf {
        self.work_dir.join(format!("{}.done", key.stem()))
    }

    /// Claim the run slot for a key: single-flight per (tenant, model, mode).
    ///
    /// A lock owned by a live process yields [`BeginOutcome::AlreadyRunning`];
    /// a stale lock (owner no longer alive) is removed first. Claiming also
    /// clears any prior completion marker.
    pub fn begin(&self, key: &JobKey) -> Result<BeginOutcome, JobError> {
        fs::create_dir_all(&self.work_dir)?;

        if let Some(lock) = self.read_lock(key)? {
            if process_alive(lock.pid) {
                return Ok(BeginOutcome::AlreadyRunning {
                    pid: lock.pid,
                    started_at: lock.started_at,
                });
            }
            tracing::warn!(
                pid = lock.pid,
                job = %key.stem(),
                "removing stale lock left by a dead worker"
            );
            remove_if_present(&self.lock_path(key))?;
        }

        remove_if_present(&self.marker_path(key))?;

        let lock = LockFile {
            pid: std::process::id(),
            started_at: Utc::now(),
        };
        fs::write(
            self.lock_path(key),
            serde_json::to_vec(&lock).expect("lock file serializes"),
        )?;

        Ok(BeginOutcome::Started)
    }

    /// Drop the completion marker and release the lock.
    pub fn complete(&self, key: &JobKey) -> Result<(), JobError> {
        let started_at = self.read_lock(key)?.map(|lock| lock.started_at);
        let marker = MarkerFile {
            started_at,
            finished_at: Utc::now(),
        };
        fs::write(
            self.marker_path(key),
            serde_json::to_vec(&marker).expect("marker file serializes"),
        )?;
        remove_if_present(&self.lock_path(key))?;
        Ok(())
    }

    /// Release the lock without signalling completion (worker failed).
    pub fn abandon(&self, key: &JobKey) -> Result<(), JobError> {
        remove_if_present(&self.lock_path(key))?;
        Ok(())
    }

    pub fn state(&self, key: &JobKey) -> Result<RunState, JobError> {
        if self.marker_path(key).exists() {
            return Ok(RunState::Complete);
        }
        match self.read_lock(key)? {
            Some(lock) if process_alive(lock.pid) => Ok(RunState::Running),
            _ => Ok(RunState::NotStarted),
        }
    }

    /// Seconds the run has been going (running) or took (complete).
    pub fn elapsed_seconds(&self, key: &JobKey) -> Result<i64, JobError> {
        if let Some(marker) = self.read_marker(key)? {
            let elapsed = marker
                .started_at
                .map(|started| (marker.finished_at - started).num_seconds())
                .unwrap_or(0);
            return Ok(elapsed.max(0));
        }
        if let Some(lock) = self.read_lock(key)? {
            return Ok((Utc::now() - lock.started_at).num_seconds().max(0));
        }
        Ok(0)
    }

    /// Poll for the completion marker with a hard failsafe timeout.
    ///
    /// Timing out is not a failure verdict: the detached worker keeps going
    /// regardless of this wait loop, so callers re-poll.
    pub fn await_marker(
        &self,
        key: &JobKey,
        poll: Duration,
        failsafe: Duration,
    ) -> Result<(), JobError> {
        let deadline = Instant::now() + failsafe;
        loop {
            if self.marker_path(key).exists() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(JobError::AcknowledgmentTimeout(failsafe.as_secs()));
            }
            thread::sleep(poll);
        }
    }

    fn read_lock(&self, key: &JobKey) -> Result<Option<LockFile>, JobError> {
        read_json(&self.lock_path(key))
    }

    fn read_marker(&self, key: &JobKey) -> Result<Option<MarkerFile>, JobError> {
        read_json(&self.marker_path(key))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, JobError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    // A torn or corrupt file counts as absent; begin() rewrites it.
    Ok(serde_json::from_slice(&bytes).ok())
}

fn remove_if_present(path: &Path) -> Result<(), JobError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Without procfs a lock cannot be verified; treat it as stale so a
    // crashed owner never wedges the slot forever.
    false
}

/// Facility detaching a bulk worker from the initiating request.
pub trait JobSpawner: Send + Sync {
    fn spawn(&self, name: &str, work: Box<dyn FnOnce() + Send + 'static>)
        -> Result<(), JobError>;
}

/// Production spawner: a detached OS thread that outlives the request.
#[derive(Debug, Default, Clone)]
pub struct ThreadSpawner;

impl JobSpawner for ThreadSpawner {
    fn spawn(
        &self,
        name: &str,
        work: Box<dyn FnOnce() + Send + 'static>,
    ) -> Result<(), JobError> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .map(|_| ())
            .map_err(|err| JobError::Spawn(err.to_string()))
    }
}
