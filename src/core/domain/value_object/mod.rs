mod ide_storage;
mod netmask;
mod patch;
mod proxmox_csrf_token;
mod proxmox_host;
mod proxmox_password;
mod proxmox_port;
mod proxmox_realm;
mod proxmox_ticket;
mod proxmox_uri;
mod proxmox_username;
pub(crate) mod serde_helpers;

pub use ide_storage::{InternalDataStorage, MAX_IDE_DEVICES, validate_ide_devices};
pub use netmask::{Netmask, mask_to_prefix, prefix_to_mask};
pub use patch::{DELETE_PARAM, Patch, int_bool, into_create_payload, into_payload};
pub use proxmox_csrf_token::{CSRF_HEADER_NAME, ProxmoxCSRFToken};
pub use proxmox_host::ProxmoxHost;
pub use proxmox_password::ProxmoxPassword;
pub use proxmox_port::{DEFAULT_PORT, ProxmoxPort};
pub use proxmox_realm::ProxmoxRealm;
pub use proxmox_ticket::{AUTH_COOKIE_NAME, ProxmoxTicket};
pub use proxmox_uri::ProxmoxUrl;
pub use proxmox_username::ProxmoxUsername;

// Re-export validation functions for internal use
pub(crate) use proxmox_csrf_token::validate_csrf_token;
pub(crate) use proxmox_host::{resolve_host, validate_host};
pub(crate) use proxmox_password::validate_password;
pub(crate) use proxmox_port::validate_port;
pub(crate) use proxmox_realm::validate_realm;
pub(crate) use proxmox_ticket::validate_ticket;
pub(crate) use proxmox_username::validate_username;
