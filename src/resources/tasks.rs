use crate::{
    ProxmoxClient,
    core::{
        domain::{
            error::{ProxmoxResult, ResultExt},
            model::task::Task,
        },
        infrastructure::task_poller::{TaskPoller, TaskStatusSource},
    },
};
use std::time::Duration;
use tracing::{info, instrument};

impl ProxmoxClient {
    /// Reads the current status of a task.
    pub async fn task_status(&self, node: &str, upid: &str) -> ProxmoxResult<Task> {
        self.api_client
            .task_status(node, upid)
            .await
            .context("task_status", || format!("{}/{}", node, upid))
    }

    /// Blocks until the task stops, using the configured poll interval and
    /// task timeout.
    ///
    /// # Errors
    /// `TaskFailed` when the exit status is not `OK`, `TaskTimeout` when a
    /// configured deadline passes first.
    #[instrument(skip(self))]
    pub async fn await_task(&self, node: &str, upid: &str) -> ProxmoxResult<Task> {
        self.wait_for_task(node, upid, self.config.task_timeout)
            .await
            .context("await_task", || format!("{}/{}", node, upid))
    }

    /// Like [`await_task`](Self::await_task) with a deadline for this call only.
    #[instrument(skip(self))]
    pub async fn await_task_with_timeout(
        &self,
        node: &str,
        upid: &str,
        timeout: Duration,
    ) -> ProxmoxResult<Task> {
        self.wait_for_task(node, upid, Some(timeout))
            .await
            .context("await_task", || format!("{}/{}", node, upid))
    }

    pub(crate) async fn wait_for_task(
        &self,
        node: &str,
        upid: &str,
        timeout: Option<Duration>,
    ) -> ProxmoxResult<Task> {
        info!(node, upid, "waiting for task");
        TaskPoller::new(&self.api_client, self.config.task_poll_interval)
            .with_timeout(timeout)
            .wait(node, upid)
            .await
    }

    /// Awaits `upid` when the mutation that returned it runs asynchronously.
    pub(crate) async fn wait_if_task(&self, node: &str, upid: Option<String>) -> ProxmoxResult<()> {
        if let Some(upid) = upid {
            self.wait_for_task(node, &upid, self.config.task_timeout)
                .await?;
        }
        Ok(())
    }
}
