use crate::{
    ProxmoxClient,
    core::domain::{
        error::{ProxmoxResult, ResultExt},
        model::node::Node,
    },
};
use tracing::instrument;

impl ProxmoxClient {
    /// Lists the nodes of the cluster.
    #[instrument(skip(self))]
    pub async fn nodes(&self) -> ProxmoxResult<Vec<Node>> {
        self.api_client
            .get("nodes")
            .await
            .context("list_nodes", || "cluster".to_string())
    }
}
