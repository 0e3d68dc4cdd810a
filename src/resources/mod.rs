//! Resource operations exposed on [`ProxmoxClient`](crate::ProxmoxClient).
//!
//! Every public operation wraps its failure in `ProxmoxError::Operation`
//! naming the operation and the `node/resource` it targeted.

mod networks;
mod nodes;
mod tasks;
mod vms;
