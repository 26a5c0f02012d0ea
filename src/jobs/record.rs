use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique job identifier (UUIDv7, so ids sort by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Video,
    Playlist,
}

/// Job lifecycle: `pending -> running -> {completed, error, cancelled}`,
/// plus `pending -> cancelled` when cancelled before the runner starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// How a runner ends a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Completed,
    Failed(String),
    Cancelled,
}

/// Point-in-time copy of a job, safe to hand out past the registry lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub kind: JobKind,
    pub url: String,
    pub status: JobStatus,
    /// Percent in [0, 100], rounded to two decimals
    pub progress: f64,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub cancel_requested: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Mutable job state, owned by the registry
///
/// Every mutator is a no-op once the status is terminal.
#[derive(Debug)]
pub struct JobRecord {
    id: JobId,
    kind: JobKind,
    url: String,
    status: JobStatus,
    progress: f64,
    filename: Option<String>,
    error: Option<String>,
    cancel_requested: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub(crate) fn new(kind: JobKind, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            url,
            status: JobStatus::Pending,
            progress: 0.0,
            filename: None,
            error: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            kind: self.kind,
            url: self.url.clone(),
            status: self.status,
            progress: (self.progress * 100.0).round() / 100.0,
            filename: self.filename.clone(),
            error: self.error.clone(),
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// `pending -> running`; false when the job already left `pending`
    pub(crate) fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.touch();
        true
    }

    /// Raise the flag; a job nobody has started yet is cancelled on the spot
    pub(crate) fn request_cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.cancel_requested = true;
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Cancelled;
        }
        self.touch();
    }

    /// Progress only moves forward and only while running
    pub(crate) fn advance_progress(&mut self, percent: f64) {
        if self.status != JobStatus::Running || !percent.is_finite() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        if percent > self.progress {
            self.progress = percent;
            self.touch();
        }
    }

    /// The first reported filename sticks
    pub(crate) fn record_filename(&mut self, filename: &str) {
        if self.status != JobStatus::Running || self.filename.is_some() || filename.is_empty() {
            return;
        }
        self.filename = Some(filename.to_string());
        self.touch();
    }

    /// Move to a terminal status; false when already terminal
    pub(crate) fn resolve(&mut self, resolution: Resolution) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match resolution {
            Resolution::Completed => self.status = JobStatus::Completed,
            Resolution::Cancelled => self.status = JobStatus::Cancelled,
            Resolution::Failed(message) => {
                let message = message.trim();
                self.status = JobStatus::Error;
                self.error = Some(if message.is_empty() {
                    "download failed".to_string()
                } else {
                    message.to_string()
                });
            }
        }
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
