//! Domain models for QEMU virtual machine operations.
//!
//! The config endpoint returns a flat map where attached devices appear as
//! numbered keys (`ide2`, `scsi0`, `net0`). [`VirtualMachine`] gathers those
//! into typed collections; [`VirtualMachineRequest`] flattens them back.

use crate::core::domain::{
    error::{ProxmoxError, ProxmoxResult, ValidationError},
    value_object::{
        DELETE_PARAM, InternalDataStorage, Patch, int_bool, into_create_payload, into_payload,
        serde_helpers::{lenient_u32, lenient_u64},
        validate_ide_devices,
    },
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Status value of a VM that is not running.
pub const VM_STATUS_STOPPED: &str = "stopped";

/// A virtual machine as returned by the `/nodes/{node}/qemu` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VmListItem {
    /// The VM identifier (unique per cluster).
    #[serde(deserialize_with = "lenient_u32::required")]
    pub vmid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current status ("running", "stopped").
    pub status: String,
    /// CPU usage, 0.0 to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub cpus: Option<u32>,
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
    /// Uptime in seconds (if running).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Runtime status from `/nodes/{node}/qemu/{vmid}/status/current`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VmStatusCurrent {
    /// "running" or "stopped".
    pub status: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32::deserialize"
    )]
    pub vmid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// QEMU monitor status, finer grained than `status` ("paused", "prelaunch").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qmpstatus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
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
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub uptime: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64::deserialize"
    )]
    pub pid: Option<u64>,
    #[serde(
        rename = "running-qemu",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub running_qemu: Option<String>,
}

impl VmStatusCurrent {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status == VM_STATUS_STOPPED
    }
}

/// The configuration of a VM, decoded from `/nodes/{node}/qemu/{vmid}/config`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualMachine {
    pub vmid: u32,
    pub name: Option<String>,
    pub cores: Option<u32>,
    pub sockets: Option<u32>,
    /// Memory in MiB.
    pub memory: Option<u64>,
    pub scsihw: Option<String>,
    pub ostype: Option<String>,
    pub boot: Option<String>,
    pub digest: Option<String>,
    /// Attached IDE devices, ordered by slot.
    pub ide_devices: Vec<InternalDataStorage>,
    /// Raw `scsiN` descriptors by slot.
    pub scsi: BTreeMap<u8, String>,
    /// Raw `netN` descriptors by slot.
    pub net: BTreeMap<u8, String>,
}

#[derive(Deserialize)]
struct ConfigFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32::deserialize")]
    cores: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32::deserialize")]
    sockets: Option<u32>,
    #[serde(default, deserialize_with = "memory_mib")]
    memory: Option<u64>,
    #[serde(default)]
    scsihw: Option<String>,
    #[serde(default)]
    ostype: Option<String>,
    #[serde(default)]
    boot: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(flatten)]
    devices: BTreeMap<String, Value>,
}

/// `memory` is a plain number on older remotes and `current=<MiB>` on newer ones.
fn memory_mib<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Memory {
        Number(u64),
        Text(String),
    }

    match Option::<Memory>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Memory::Number(mib)) => Ok(Some(mib)),
        Some(Memory::Text(text)) => {
            let value = text
                .split(',')
                .find_map(|part| match part.split_once('=') {
                    Some(("current", v)) => Some(v),
                    Some(_) => None,
                    None => Some(part),
                })
                .unwrap_or_default();
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid memory '{}'", text)))
        }
    }
}

fn slot_of(key: &str, prefix: &str) -> Option<u8> {
    key.strip_prefix(prefix)
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

fn descriptor(key: &str, value: &Value) -> ProxmoxResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ProxmoxError::Decode(format!(
            "expected a descriptor string for '{}', got {}",
            key, other
        ))),
    }
}

impl VirtualMachine {
    /// Decodes the `data` object of a config response.
    pub fn from_config(vmid: u32, config: Value) -> ProxmoxResult<Self> {
        let fields: ConfigFields = serde_json::from_value(config)?;

        let mut vm = Self {
            vmid,
            name: fields.name,
            cores: fields.cores,
            sockets: fields.sockets,
            memory: fields.memory,
            scsihw: fields.scsihw,
            ostype: fields.ostype,
            boot: fields.boot,
            digest: fields.digest,
            ..Default::default()
        };

        for (key, value) in &fields.devices {
            if let Some(slot) = slot_of(key, "ide") {
                let data = descriptor(key, value)?;
                if let Some(device) = InternalDataStorage::decode(i32::from(slot), &data)? {
                    vm.ide_devices.push(device);
                }
            } else if let Some(slot) = slot_of(key, "scsi") {
                vm.scsi.insert(slot, descriptor(key, value)?);
            } else if let Some(slot) = slot_of(key, "net") {
                vm.net.insert(slot, descriptor(key, value)?);
            }
        }
        vm.ide_devices.sort_by_key(|device| device.id);

        Ok(vm)
    }

    /// Returns the IDE device in `slot`, if any.
    pub fn ide(&self, slot: i32) -> Option<&InternalDataStorage> {
        self.ide_devices.iter().find(|device| device.id == slot)
    }
}

/// Parameters for creating or reconfiguring a VM.
///
/// Scalar settings are [`Patch`] fields: untouched ones are not sent. IDE
/// devices listed in `ide_devices` are attached (or replaced); slots in
/// `detach_ide` are removed on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualMachineRequest {
    #[serde(skip)]
    pub vmid: u32,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub cores: Patch<u32>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub sockets: Patch<u32>,
    /// Memory in MiB.
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub memory: Patch<u64>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub scsihw: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub ostype: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    pub boot: Patch<String>,
    #[serde(skip)]
    pub ide_devices: Vec<InternalDataStorage>,
    #[serde(skip)]
    pub detach_ide: Vec<i32>,
    /// `scsiN` descriptors by slot.
    #[serde(skip)]
    pub scsi: BTreeMap<u8, Patch<String>>,
    /// `netN` descriptors by slot.
    #[serde(skip)]
    pub net: BTreeMap<u8, Patch<String>>,
}

impl VirtualMachineRequest {
    pub fn new(vmid: u32) -> Self {
        Self {
            vmid,
            ..Default::default()
        }
    }

    pub fn with_cores(mut self, cores: u32) -> Self {
        self.cores = Patch::Set(cores);
        self
    }

    pub fn with_memory(mut self, memory_mib: u64) -> Self {
        self.memory = Patch::Set(memory_mib);
        self
    }

    pub fn with_ide(mut self, device: InternalDataStorage) -> Self {
        self.ide_devices.push(device);
        self
    }

    pub fn with_scsi(mut self, slot: u8, descriptor: impl Into<String>) -> Self {
        self.scsi.insert(slot, Patch::Set(descriptor.into()));
        self
    }

    pub fn with_net(mut self, slot: u8, descriptor: impl Into<String>) -> Self {
        self.net.insert(slot, Patch::Set(descriptor.into()));
        self
    }

    /// Removes the device in IDE `slot` on update.
    pub fn detach_ide(mut self, slot: i32) -> Self {
        self.detach_ide.push(slot);
        self
    }

    /// Checks the IDE layout. Runs before anything is sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_ide_devices(&self.ide_devices)?;
        for slot in &self.detach_ide {
            if !(0..4).contains(slot) {
                return Err(ValidationError::Field {
                    field: format!("ide{}", slot),
                    message: format!("Invalid ID for IDE device: {} (must be 0-3)", slot),
                });
            }
            if self.ide_devices.iter().any(|device| device.id == *slot) {
                return Err(ValidationError::ConstraintViolation(format!(
                    "IDE slot {} is both attached and detached",
                    slot
                )));
            }
        }
        Ok(())
    }

    /// Body of a create call. Cleared and detached entries are meaningless here
    /// and are left out.
    pub(crate) fn create_payload(&self) -> ProxmoxResult<Map<String, Value>> {
        self.validate()?;
        let mut payload = into_create_payload(self)?;
        payload.insert("vmid".to_string(), Value::from(self.vmid));
        self.insert_devices(&mut payload, None)?;
        Ok(payload)
    }

    /// Body of a config update.
    pub(crate) fn update_payload(&self) -> ProxmoxResult<Map<String, Value>> {
        self.validate()?;
        let mut payload = into_payload(self)?;
        let mut cleared: Vec<String> = self
            .detach_ide
            .iter()
            .map(|slot| format!("ide{}", slot))
            .collect();
        self.insert_devices(&mut payload, Some(&mut cleared))?;

        if !cleared.is_empty() {
            let mut names: Vec<String> = match payload.remove(DELETE_PARAM) {
                Some(Value::String(list)) => list.split(',').map(str::to_string).collect(),
                _ => Vec::new(),
            };
            names.append(&mut cleared);
            debug!(vmid = self.vmid, fields = %names.join(","), "removing VM settings");
            payload.insert(DELETE_PARAM.to_string(), Value::String(names.join(",")));
        }
        Ok(payload)
    }

    fn insert_devices(
        &self,
        payload: &mut Map<String, Value>,
        mut cleared: Option<&mut Vec<String>>,
    ) -> ProxmoxResult<()> {
        for device in &self.ide_devices {
            payload.insert(device.key(), Value::String(device.encode()?));
        }
        for (prefix, slots) in [("scsi", &self.scsi), ("net", &self.net)] {
            for (slot, patch) in slots {
                let key = format!("{}{}", prefix, slot);
                match patch {
                    Patch::Set(value) => {
                        payload.insert(key, Value::String(value.clone()));
                    }
                    Patch::Clear => {
                        if let Some(cleared) = cleared.as_deref_mut() {
                            cleared.push(key);
                        }
                    }
                    Patch::Unchanged => {}
                }
            }
        }
        Ok(())
    }
}

/// Body of `POST .../qemu/{vmid}/clone`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CloneRequest {
    pub newid: u32,
    #[serde(
        skip_serializing_if = "Patch::is_unchanged",
        serialize_with = "int_bool::serialize"
    )]
    pub full: Patch<bool>,
}
