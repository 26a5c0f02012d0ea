//! Job bookkeeping and execution
//!
//! - [`JobRegistry`] - lock-protected store of every job in the process
//! - [`JobRecord`] - one job's mutable state and its transition rules
//! - [`JobRunner`] - runs a job on its own task and translates downloader
//!   progress into record updates
//!
//! Cancellation is cooperative: [`JobRegistry::request_cancel`] only raises a
//! flag, and the runner's progress callback answers the next event with
//! [`Signal::Abort`](crate::downloader::Signal::Abort).

mod record;
mod registry;
mod runner;

pub use record::{JobId, JobKind, JobRecord, JobSnapshot, JobStatus, Resolution};
pub use registry::JobRegistry;
pub use runner::{JobRunner, download_percent};
