//! Asynchronous remote tasks.
//!
//! Mutating calls return a UPID (`UPID:pve:000B1C9F:...`) naming the task the
//! remote started. Its state is read from `nodes/{node}/tasks/{upid}/status`.

use crate::core::domain::{error::TaskFailure, value_object::serde_helpers::lenient_u64};
use serde::{Deserialize, Serialize};

/// Exit status reported by a task that completed successfully.
pub const TASK_EXIT_OK: &str = "OK";

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Stopped,
    /// Any state this client does not know; treated as still in progress.
    #[serde(other)]
    Unknown,
}

/// A task status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    #[serde(default)]
    pub upid: String,
    #[serde(default)]
    pub node: String,
    pub status: TaskStatus,
    /// Present once the task has stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exitstatus: Option<String>,
    /// Task type, e.g. `qmcreate` or `srvreload`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    /// Object the task works on, e.g. a VM id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub pid: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub starttime: Option<u64>,
}

impl Task {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status == TaskStatus::Stopped
    }

    /// Returns `None` while the task is still running, otherwise whether it
    /// succeeded. A stopped task without an exit status counts as failed.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<(), TaskFailure>> {
        if !self.is_stopped() {
            return None;
        }
        Some(match self.exitstatus.as_deref() {
            Some(TASK_EXIT_OK) => Ok(()),
            Some(status) => Err(TaskFailure::ExitStatus(status.to_string())),
            None => Err(TaskFailure::NoExitStatus),
        })
    }
}
