//! Hypervisor hosts as listed by the `nodes` endpoint.

use crate::core::domain::value_object::serde_helpers::lenient_u64;
use serde::{Deserialize, Serialize};

/// A node of the cluster. Read-only from the client's point of view.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    /// The node name (e.g., "pve1").
    #[serde(rename = "node")]
    pub name: String,
    /// Resource type, always "node" for this endpoint.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Current node status ("online", "offline", "unknown").
    pub status: String,
    /// Unique resource identifier (e.g., "node/pve1").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// CPU usage, 0.0 to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub maxcpu: Option<u64>,
    /// Memory usage in bytes.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub mem: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub maxmem: Option<u64>,
    /// Root disk usage in bytes.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub disk: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub maxdisk: Option<u64>,
    /// Uptime in seconds.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub uptime: Option<u64>,
    /// Support subscription level, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_fingerprint: Option<String>,
}

impl Node {
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}
