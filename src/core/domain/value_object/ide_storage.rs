//! IDE storage descriptors.
//!
//! A VM exposes up to four IDE slots (`ide0`..`ide3`); each one is configured
//! with a single comma-separated string:
//!
//! ```text
//! local:iso/ubuntu-24.04.1-live-server-amd64.iso,media=cdrom,size=2690412K
//! local-lvm:32
//! ```
//!
//! The first token is `<storage>:<volume>`. When writing, `<storage>:<size>`
//! (size in GiB, no volume path) asks the remote to allocate a new volume.
//! The remaining tokens are `key=value` options; only `media` and `size` are
//! kept, anything else is ignored when decoding.

use crate::core::domain::error::{ProxmoxError, ValidationError};
use tracing::debug;

/// Number of IDE slots a VM has.
pub const MAX_IDE_DEVICES: usize = 4;

/// A storage attachment in one of the VM's IDE slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalDataStorage {
    /// Slot number, 0 through 3.
    pub id: i32,
    /// Storage pool the volume lives on (`local`, `local-lvm`, ...).
    pub storage: String,
    /// Existing volume path, e.g. `iso/ubuntu.iso`.
    pub path: Option<String>,
    /// Media type, e.g. `cdrom`.
    pub media: Option<String>,
    /// Size annotation (`2690412K`), or the GiB count of a volume to allocate
    /// when `path` is absent.
    pub size: Option<String>,
}

impl InternalDataStorage {
    /// An existing volume attached as a disk.
    pub fn existing(id: i32, storage: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            storage: storage.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// An image attached as a CD-ROM.
    pub fn cdrom(id: i32, storage: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            media: Some("cdrom".to_string()),
            ..Self::existing(id, storage, path)
        }
    }

    /// A new volume of `size_gib` GiB to be allocated on `storage`.
    pub fn new_volume(id: i32, storage: impl Into<String>, size_gib: u32) -> Self {
        Self {
            id,
            storage: storage.into(),
            size: Some(size_gib.to_string()),
            ..Default::default()
        }
    }

    /// Returns the config key of this slot (`ide2`).
    #[must_use]
    pub fn key(&self) -> String {
        format!("ide{}", self.id)
    }

    /// Decodes the descriptor stored in slot `id`. An empty string means the
    /// slot is unused.
    pub fn decode(id: i32, data: &str) -> Result<Option<Self>, ProxmoxError> {
        if data.is_empty() {
            return Ok(None);
        }
        debug!(slot = id, data, "decoding IDE descriptor");

        let mut tokens = data.split(',').peekable();
        let volume = tokens.next().unwrap_or_default();
        let (storage, volume) = match volume.split_once(':') {
            Some((storage, volume)) => (storage, Some(volume)),
            // e.g. `none,media=cdrom` for an empty drive
            None => (volume, None),
        };
        if storage.is_empty() {
            return Err(ProxmoxError::Decode(format!(
                "IDE descriptor '{}' has no storage",
                data
            )));
        }

        let mut device = Self {
            id,
            storage: storage.to_string(),
            ..Default::default()
        };
        match volume {
            // `<storage>:<GiB>` with nothing after it is a volume to allocate
            Some(size) if tokens.peek().is_none() && is_size_shorthand(size) => {
                device.size = Some(size.to_string());
            }
            volume => device.path = volume.map(str::to_string),
        }
        for token in tokens {
            match token.split_once('=') {
                Some(("media", value)) => device.media = Some(value.to_string()),
                Some(("size", value)) => device.size = Some(value.to_string()),
                _ => {}
            }
        }
        Ok(Some(device))
    }

    /// Encodes the descriptor into the remote's string form.
    pub fn encode(&self) -> Result<String, ValidationError> {
        validate_slot(self.id)?;
        if self.storage.is_empty() {
            return Err(ValidationError::Field {
                field: self.key(),
                message: "Storage is required for IDE device".to_string(),
            });
        }

        let size = self.size.as_deref().filter(|s| !s.is_empty());
        let path = self.path.as_deref().filter(|p| !p.is_empty());

        let Some(path) = path else {
            return match (self.path.as_ref(), size) {
                (None, Some(size)) => {
                    debug!(slot = self.id, storage = %self.storage, size, "allocating new IDE volume");
                    Ok(format!("{}:{}", self.storage, size))
                }
                _ => Err(ValidationError::Field {
                    field: self.key(),
                    message: "A volume path or a size for a new volume is required".to_string(),
                }),
            };
        };

        let mut data = format!("{}:{}", self.storage, path);
        if let Some(media) = self.media.as_deref().filter(|m| !m.is_empty()) {
            data.push_str(",media=");
            data.push_str(media);
        }
        if let Some(size) = size {
            data.push_str(",size=");
            data.push_str(size);
        }
        Ok(data)
    }
}

fn is_size_shorthand(volume: &str) -> bool {
    !volume.is_empty() && volume.bytes().all(|b| b.is_ascii_digit())
}

/// Checks that `id` names one of the four IDE slots.
pub fn validate_slot(id: i32) -> Result<(), ValidationError> {
    if !(0..MAX_IDE_DEVICES as i32).contains(&id) {
        return Err(ValidationError::Field {
            field: format!("ide{}", id),
            message: format!("Invalid ID for IDE device: {} (must be 0-3)", id),
        });
    }
    Ok(())
}

/// Checks a full set of IDE devices before anything is sent.
pub fn validate_ide_devices(devices: &[InternalDataStorage]) -> Result<(), ValidationError> {
    if devices.len() > MAX_IDE_DEVICES {
        return Err(ValidationError::ConstraintViolation(format!(
            "Invalid number of IDE devices: {}. Only {} are allowed",
            devices.len(),
            MAX_IDE_DEVICES
        )));
    }
    let mut seen = [false; MAX_IDE_DEVICES];
    for device in devices {
        validate_slot(device.id)?;
        let slot = &mut seen[device.id as usize];
        if *slot {
            return Err(ValidationError::ConstraintViolation(format!(
                "IDE slot {} is configured twice",
                device.id
            )));
        }
        *slot = true;
    }
    Ok(())
}
