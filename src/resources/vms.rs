use crate::{
    ProxmoxClient,
    core::domain::{
        error::{ProxmoxError, ProxmoxResult, ResultExt},
        model::vm::{
            CloneRequest, VirtualMachine, VirtualMachineRequest, VmListItem, VmStatusCurrent,
        },
        value_object::Patch,
    },
};
use reqwest::Method;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument};
use urlencoding::encode;

impl ProxmoxClient {
    /// Lists the QEMU virtual machines on `node`.
    #[instrument(skip(self))]
    pub async fn vms(&self, node: &str) -> ProxmoxResult<Vec<VmListItem>> {
        self.api_client
            .get(&format!("nodes/{}/qemu", encode(node)))
            .await
            .context("list_vms", || node.to_string())
    }

    /// Reads the configuration of a VM.
    #[instrument(skip(self))]
    pub async fn vm(&self, node: &str, vmid: u32) -> ProxmoxResult<VirtualMachine> {
        self.fetch_vm(node, vmid)
            .await
            .context("get_vm", || format!("{}/{}", node, vmid))
    }

    /// Reads the runtime status of a VM.
    #[instrument(skip(self))]
    pub async fn vm_status(&self, node: &str, vmid: u32) -> ProxmoxResult<VmStatusCurrent> {
        self.fetch_vm_status(node, vmid)
            .await
            .context("vm_status", || format!("{}/{}", node, vmid))
    }

    /// Creates a VM and returns its configuration once the create task has
    /// finished. With `start`, the VM is also booted and the start task
    /// awaited.
    ///
    /// The IDE layout is validated before anything is sent.
    #[instrument(skip(self, request), fields(vmid = request.vmid))]
    pub async fn create_vm(
        &self,
        node: &str,
        request: &VirtualMachineRequest,
        start: bool,
    ) -> ProxmoxResult<VirtualMachine> {
        self.submit_vm_create(node, request, start)
            .await
            .context("create_vm", || format!("{}/{}", node, request.vmid))
    }

    /// Changes the configuration of a VM.
    #[instrument(skip(self, request), fields(vmid = request.vmid))]
    pub async fn update_vm(
        &self,
        node: &str,
        request: &VirtualMachineRequest,
    ) -> ProxmoxResult<VirtualMachine> {
        self.submit_vm_update(node, request)
            .await
            .context("update_vm", || format!("{}/{}", node, request.vmid))
    }

    /// Deletes a VM, stopping it first if it is running.
    #[instrument(skip(self))]
    pub async fn delete_vm(&self, node: &str, vmid: u32) -> ProxmoxResult<()> {
        self.submit_vm_delete(node, vmid)
            .await
            .context("delete_vm", || format!("{}/{}", node, vmid))
    }

    /// Starts a VM and returns the UPID of the start task without waiting.
    #[instrument(skip(self))]
    pub async fn start_vm(&self, node: &str, vmid: u32) -> ProxmoxResult<String> {
        self.vm_power(node, vmid, "start")
            .await
            .context("start_vm", || format!("{}/{}", node, vmid))
    }

    /// Stops a VM and returns the UPID of the stop task without waiting.
    #[instrument(skip(self))]
    pub async fn stop_vm(&self, node: &str, vmid: u32) -> ProxmoxResult<String> {
        self.vm_power(node, vmid, "stop")
            .await
            .context("stop_vm", || format!("{}/{}", node, vmid))
    }

    /// Clones `vmid` into `new_vmid` and returns the clone's configuration.
    /// `full` makes an independent copy of the disks instead of a linked clone.
    #[instrument(skip(self))]
    pub async fn clone_vm(
        &self,
        node: &str,
        vmid: u32,
        new_vmid: u32,
        full: bool,
    ) -> ProxmoxResult<VirtualMachine> {
        self.submit_vm_clone(node, vmid, new_vmid, full)
            .await
            .context("clone_vm", || format!("{}/{}", node, vmid))
    }

    async fn fetch_vm(&self, node: &str, vmid: u32) -> ProxmoxResult<VirtualMachine> {
        let config: Value = self
            .api_client
            .get(&format!("nodes/{}/qemu/{}/config", encode(node), vmid))
            .await?;
        VirtualMachine::from_config(vmid, config)
    }

    async fn fetch_vm_status(&self, node: &str, vmid: u32) -> ProxmoxResult<VmStatusCurrent> {
        self.api_client
            .get(&format!("nodes/{}/qemu/{}/status/current", encode(node), vmid))
            .await
    }

    async fn submit_vm_create(
        &self,
        node: &str,
        request: &VirtualMachineRequest,
        start: bool,
    ) -> ProxmoxResult<VirtualMachine> {
        let payload = request.create_payload()?;

        let upid: Option<String> = self
            .api_client
            .post(&format!("nodes/{}/qemu", encode(node)), &payload)
            .await?;
        self.wait_if_task(node, upid).await?;
        info!(node, vmid = request.vmid, "vm created");

        if start {
            let upid = self.vm_power(node, request.vmid, "start").await?;
            self.wait_if_task(node, Some(upid)).await?;
            info!(node, vmid = request.vmid, "vm started");
        }

        self.fetch_vm(node, request.vmid).await
    }

    async fn submit_vm_update(
        &self,
        node: &str,
        request: &VirtualMachineRequest,
    ) -> ProxmoxResult<VirtualMachine> {
        let payload = request.update_payload()?;

        // PUT applies the change synchronously; a task id only comes back when
        // the remote decided to run it in the background
        let upid: Option<String> = self
            .api_client
            .put(&format!("nodes/{}/qemu/{}/config", encode(node), request.vmid), &payload)
            .await?;
        self.wait_if_task(node, upid).await?;
        info!(node, vmid = request.vmid, "vm updated");

        self.fetch_vm(node, request.vmid).await
    }

    async fn submit_vm_delete(&self, node: &str, vmid: u32) -> ProxmoxResult<()> {
        let status = self.fetch_vm_status(node, vmid).await?;
        if !status.is_stopped() {
            info!(node, vmid, status = %status.status, "stopping vm before delete");
            let upid = self.vm_power(node, vmid, "stop").await?;
            self.wait_if_task(node, Some(upid.clone())).await?;
            self.wait_until_stopped(node, vmid, &upid).await?;
        }

        let upid: Option<String> = self
            .api_client
            .delete(&format!("nodes/{}/qemu/{}", encode(node), vmid))
            .await?;
        self.wait_if_task(node, upid).await?;
        info!(node, vmid, "vm deleted");
        Ok(())
    }

    /// The stop task can finish before the status endpoint reports `stopped`.
    async fn wait_until_stopped(&self, node: &str, vmid: u32, upid: &str) -> ProxmoxResult<()> {
        let started = Instant::now();
        loop {
            let status = self.fetch_vm_status(node, vmid).await?;
            if status.is_stopped() {
                return Ok(());
            }
            if let Some(limit) = self.config.task_timeout
                && started.elapsed() >= limit
            {
                return Err(ProxmoxError::TaskTimeout {
                    upid: upid.to_string(),
                    waited: limit,
                });
            }
            debug!(node, vmid, status = %status.status, "vm not stopped yet");
            sleep(self.config.task_poll_interval).await;
        }
    }

    async fn vm_power(&self, node: &str, vmid: u32, action: &str) -> ProxmoxResult<String> {
        let upid: String = self
            .api_client
            .request(
                Method::POST,
                &format!("nodes/{}/qemu/{}/status/{}", encode(node), vmid, action),
                None::<&()>,
            )
            .await?;
        debug!(node, vmid, action, upid = %upid, "power task submitted");
        Ok(upid)
    }

    async fn submit_vm_clone(
        &self,
        node: &str,
        vmid: u32,
        new_vmid: u32,
        full: bool,
    ) -> ProxmoxResult<VirtualMachine> {
        let body = CloneRequest {
            newid: new_vmid,
            full: Patch::Set(full),
        };
        let upid: Option<String> = self
            .api_client
            .post(&format!("nodes/{}/qemu/{}/clone", encode(node), vmid), &body)
            .await?;
        self.wait_if_task(node, upid).await?;
        info!(node, vmid, new_vmid, full, "vm cloned");

        self.fetch_vm(node, new_vmid).await
    }
}
