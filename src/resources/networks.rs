use crate::{
    ProxmoxClient,
    core::domain::{
        error::{ProxmoxResult, ResultExt, ValidationError},
        model::network::{Network, NetworkRequest},
        value_object::{into_create_payload, into_payload},
    },
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument};
use urlencoding::encode;

impl ProxmoxClient {
    /// Lists the interfaces configured on `node`.
    #[instrument(skip(self))]
    pub async fn networks(&self, node: &str) -> ProxmoxResult<Vec<Network>> {
        self.api_client
            .get(&format!("nodes/{}/network", encode(node)))
            .await
            .context("list_networks", || node.to_string())
    }

    /// Reads one interface.
    #[instrument(skip(self))]
    pub async fn network(&self, node: &str, iface: &str) -> ProxmoxResult<Network> {
        self.fetch_network(node, iface)
            .await
            .context("get_network", || format!("{}/{}", node, iface))
    }

    /// Creates an interface, reloads the node's network service and returns
    /// the interface as the node now reports it.
    #[instrument(skip(self, request), fields(iface = %request.iface))]
    pub async fn create_network(
        &self,
        node: &str,
        request: &NetworkRequest,
    ) -> ProxmoxResult<Network> {
        self.submit_network_create(node, request)
            .await
            .context("create_network", || format!("{}/{}", node, request.iface))
    }

    /// Applies the touched fields of `request` to an existing interface.
    ///
    /// Fields left as `Patch::Unchanged` are not sent and keep their current
    /// value on the node.
    #[instrument(skip(self, request), fields(iface = %request.iface))]
    pub async fn update_network(
        &self,
        node: &str,
        request: &NetworkRequest,
    ) -> ProxmoxResult<Network> {
        self.submit_network_update(node, request)
            .await
            .context("update_network", || format!("{}/{}", node, request.iface))
    }

    /// Removes an interface and reloads the node's network service.
    #[instrument(skip(self))]
    pub async fn delete_network(&self, node: &str, iface: &str) -> ProxmoxResult<()> {
        self.submit_network_delete(node, iface)
            .await
            .context("delete_network", || format!("{}/{}", node, iface))
    }

    /// Applies pending interface changes on `node` and waits for the reload
    /// task.
    #[instrument(skip(self))]
    pub async fn reload_network(&self, node: &str) -> ProxmoxResult<()> {
        self.apply_network_changes(node)
            .await
            .context("reload_network", || node.to_string())
    }

    async fn fetch_network(&self, node: &str, iface: &str) -> ProxmoxResult<Network> {
        let mut network: Network = self
            .api_client
            .get(&format!("nodes/{}/network/{}", encode(node), encode(iface)))
            .await?;
        // the single-interface endpoint omits the name
        if network.iface.is_empty() {
            network.iface = iface.to_string();
        }
        Ok(network)
    }

    async fn submit_network_create(
        &self,
        node: &str,
        request: &NetworkRequest,
    ) -> ProxmoxResult<Network> {
        require_iface(request)?;
        let mut payload = into_create_payload(request)?;
        payload.insert("iface".to_string(), Value::String(request.iface.clone()));

        let upid: Option<String> = self
            .api_client
            .post(&format!("nodes/{}/network", encode(node)), &payload)
            .await?;
        self.wait_if_task(node, upid).await?;
        self.apply_network_changes(node).await?;

        info!(node, iface = %request.iface, kind = %request.network_type, "network created");
        self.fetch_network(node, &request.iface).await
    }

    async fn submit_network_update(
        &self,
        node: &str,
        request: &NetworkRequest,
    ) -> ProxmoxResult<Network> {
        require_iface(request)?;
        let payload = into_payload(request)?;
        debug!(node, iface = %request.iface, fields = payload.len(), "updating network");

        let upid: Option<String> = self
            .api_client
            .put(
                &format!("nodes/{}/network/{}", encode(node), encode(&request.iface)),
                &payload,
            )
            .await?;
        self.wait_if_task(node, upid).await?;
        self.apply_network_changes(node).await?;

        info!(node, iface = %request.iface, "network updated");
        self.fetch_network(node, &request.iface).await
    }

    async fn submit_network_delete(&self, node: &str, iface: &str) -> ProxmoxResult<()> {
        let upid: Option<String> = self
            .api_client
            .delete(&format!("nodes/{}/network/{}", encode(node), encode(iface)))
            .await?;
        self.wait_if_task(node, upid).await?;
        self.apply_network_changes(node).await?;

        info!(node, iface, "network deleted");
        Ok(())
    }

    /// The reload always runs as a task; a response without its UPID is a
    /// `Decode` error.
    async fn apply_network_changes(&self, node: &str) -> ProxmoxResult<()> {
        let upid: String = self
            .api_client
            .request(Method::PUT, &format!("nodes/{}/network", encode(node)), None::<&()>)
            .await?;
        self.wait_for_task(node, &upid, self.config.task_timeout)
            .await?;
        debug!(node, "network configuration reloaded");
        Ok(())
    }
}

fn require_iface(request: &NetworkRequest) -> Result<(), ValidationError> {
    if request.iface.trim().is_empty() {
        return Err(ValidationError::Field {
            field: "iface".to_string(),
            message: "Interface name cannot be empty".to_string(),
        });
    }
    Ok(())
}
