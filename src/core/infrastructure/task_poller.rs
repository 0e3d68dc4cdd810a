//! Waiting for asynchronous remote tasks.
//!
//! The remote has no push channel for task completion, so the client polls
//! the task status until it reports `stopped` and then judges the exit status.

use crate::core::domain::{
    error::{ProxmoxError, ProxmoxResult},
    model::task::Task,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can report the status of a task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn task_status(&self, node: &str, upid: &str) -> ProxmoxResult<Task>;
}

/// Polls a task until it stops.
///
/// Without a timeout the poller waits for as long as the task runs. With one,
/// it gives up with [`ProxmoxError::TaskTimeout`]; the remote task itself keeps
/// running.
pub struct TaskPoller<'a, S: TaskStatusSource + ?Sized> {
    source: &'a S,
    interval: Duration,
    timeout: Option<Duration>,
}

impl<'a, S: TaskStatusSource + ?Sized> TaskPoller<'a, S> {
    pub fn new(source: &'a S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Waits for the task and returns its final status.
    ///
    /// # Errors
    /// - `TaskFailed` if it stopped with an exit status other than `OK`, or
    ///   with none at all.
    /// - `TaskTimeout` if a timeout was set and elapsed first.
    /// - Any error from querying the status, unchanged.
    pub async fn wait(&self, node: &str, upid: &str) -> ProxmoxResult<Task> {
        match self.timeout {
            None => self.poll(node, upid).await,
            Some(limit) => tokio::time::timeout(limit, self.poll(node, upid))
                .await
                .map_err(|_| {
                    warn!(node, upid, waited = ?limit, "gave up waiting for task");
                    ProxmoxError::TaskTimeout {
                        upid: upid.to_string(),
                        waited: limit,
                    }
                })?,
        }
    }

    async fn poll(&self, node: &str, upid: &str) -> ProxmoxResult<Task> {
        let mut queries: u32 = 0;
        loop {
            let task = self.source.task_status(node, upid).await?;
            queries += 1;
            match task.outcome() {
                Some(Ok(())) => {
                    info!(node, upid, queries, "task finished");
                    return Ok(task);
                }
                Some(Err(reason)) => {
                    warn!(node, upid, %reason, "task failed");
                    return Err(ProxmoxError::TaskFailed {
                        upid: upid.to_string(),
                        reason,
                    });
                }
                None => {
                    debug!(node, upid, status = ?task.status, "task still running");
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}
