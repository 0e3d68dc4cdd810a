//! Node network interface configuration.
//!
//! The read side ([`Network`]) carries fields the remote computes on its own
//! (`active`, `families`, `method`), which it refuses on write. The write side
//! ([`NetworkRequest`]) uses [`Patch`] so that an untouched field is never
//! sent and cannot reset the remote value.

use crate::core::domain::value_object::{
    Netmask, Patch, int_bool,
    serde_helpers::{lenient_bool, lenient_u32},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NetworkType {
    #[serde(rename = "bridge")]
    Bridge,
    #[serde(rename = "bond")]
    Bond,
    #[serde(rename = "eth")]
    Eth,
    #[serde(rename = "alias")]
    Alias,
    #[serde(rename = "vlan")]
    Vlan,
    OVSBridge,
    OVSBond,
    OVSPort,
    OVSIntPort,
    /// Any type this client does not know about.
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkType::Bridge => "bridge",
            NetworkType::Bond => "bond",
            NetworkType::Eth => "eth",
            NetworkType::Alias => "alias",
            NetworkType::Vlan => "vlan",
            NetworkType::OVSBridge => "OVSBridge",
            NetworkType::OVSBond => "OVSBond",
            NetworkType::OVSPort => "OVSPort",
            NetworkType::OVSIntPort => "OVSIntPort",
            NetworkType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// An interface as reported by `nodes/{node}/network[/{iface}]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Network {
    /// Interface name, unique within a node.
    #[serde(default)]
    pub iface: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Reported as a prefix length; shown as a dotted quad through `Display`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<Netmask>,
    /// Address and prefix (`10.0.0.1/24`), derived by the remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_bool::deserialize"
    )]
    pub autostart: Option<bool>,
    /// Whether the running system has the interface up.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_bool::deserialize"
    )]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub families: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method6: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_stp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_fd: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_bool::deserialize"
    )]
    pub bridge_vlan_aware: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bond_mode: Option<String>,
    #[serde(
        rename = "bond-primary",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bond_primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bond_xmit_hash_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slaves: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub mtu: Option<u32>,
    #[serde(
        rename = "vlan-id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub vlan_id: Option<u32>,
    #[serde(
        rename = "vlan-raw-device",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vlan_raw_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address6: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub netmask6: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovs_bridge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovs_bonds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovs_ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovs_options: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub ovs_tag: Option<u32>,
}

/// Create or update parameters for an interface.
///
/// `iface` and `network_type` are always required by the remote. Every other
/// field starts as [`Patch::Unchanged`]:
///
/// ```
/// use proxmox_api::{NetworkRequest, NetworkType, Patch};
///
/// let request = NetworkRequest {
///     comments: Patch::Set("uplink".to_string()),
///     gateway: Patch::Clear,
///     ..NetworkRequest::new("vmbr0", NetworkType::Bridge)
/// };
/// # let _ = request;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkRequest {
    /// Interface name. Sent in the body on create and in the path on update.
    #[serde(skip)]
    pub iface: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub address: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub netmask: Patch<Netmask>,
    /// Address with prefix, an alternative to `address` + `netmask`.
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub cidr: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub gateway: Patch<String>,
    #[serde(
        skip_serializing_if = "Patch::is_unchanged",
        serialize_with = "int_bool::serialize"
    )]
    pub autostart: Patch<bool>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub bridge_ports: Patch<String>,
    #[serde(
        skip_serializing_if = "Patch::is_unchanged",
        serialize_with = "int_bool::serialize"
    )]
    pub bridge_vlan_aware: Patch<bool>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub bond_mode: Patch<String>,
    #[serde(rename = "bond-primary", skip_serializing_if = "Patch::is_unchanged")]
    pub bond_primary: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub bond_xmit_hash_policy: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub slaves: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub mtu: Patch<u32>,
    #[serde(rename = "vlan-id", skip_serializing_if = "Patch::is_unchanged")]
    pub vlan_id: Patch<u32>,
    #[serde(rename = "vlan-raw-device", skip_serializing_if = "Patch::is_unchanged")]
    pub vlan_raw_device: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub comments: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub address6: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub netmask6: Patch<u32>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub gateway6: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub cidr6: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub comments6: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ovs_bridge: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ovs_bonds: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ovs_ports: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ovs_options: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ovs_tag: Patch<u32>,
}

impl NetworkRequest {
    /// A request that touches nothing but the required fields.
    pub fn new(iface: impl Into<String>, network_type: NetworkType) -> Self {
        Self {
            iface: iface.into(),
            network_type,
            address: Patch::Unchanged,
            netmask: Patch::Unchanged,
            cidr: Patch::Unchanged,
            gateway: Patch::Unchanged,
            autostart: Patch::Unchanged,
            bridge_ports: Patch::Unchanged,
            bridge_vlan_aware: Patch::Unchanged,
            bond_mode: Patch::Unchanged,
            bond_primary: Patch::Unchanged,
            bond_xmit_hash_policy: Patch::Unchanged,
            slaves: Patch::Unchanged,
            mtu: Patch::Unchanged,
            vlan_id: Patch::Unchanged,
            vlan_raw_device: Patch::Unchanged,
            comments: Patch::Unchanged,
            address6: Patch::Unchanged,
            netmask6: Patch::Unchanged,
            gateway6: Patch::Unchanged,
            cidr6: Patch::Unchanged,
            comments6: Patch::Unchanged,
            ovs_bridge: Patch::Unchanged,
            ovs_bonds: Patch::Unchanged,
            ovs_ports: Patch::Unchanged,
            ovs_options: Patch::Unchanged,
            ovs_tag: Patch::Unchanged,
        }
    }

    /// Sets an IPv4 address with its netmask.
    pub fn with_ipv4(mut self, address: impl Into<String>, netmask: Netmask) -> Self {
        self.address = Patch::Set(address.into());
        self.netmask = Patch::Set(netmask);
        self
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Patch::Set(gateway.into());
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = Patch::Set(autostart);
        self
    }

    pub fn with_bridge_ports(mut self, ports: impl Into<String>) -> Self {
        self.bridge_ports = Patch::Set(ports.into());
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Patch::Set(comments.into());
        self
    }
}
