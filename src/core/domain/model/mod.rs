pub mod config;
pub mod network;
pub mod node;
pub mod proxmox_auth;
pub mod proxmox_connection;
pub mod task;
pub mod vm;
