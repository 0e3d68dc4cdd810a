use crate::core::domain::value_object::{ProxmoxCSRFToken, ProxmoxTicket};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Privileges granted to the session, grouped by service
/// (`vms`, `nodes`, `storage`, ...), each mapped to `0` or `1`.
///
/// The client does not interpret these; checking them is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<String, BTreeMap<String, u8>>);

impl Capabilities {
    pub fn new(services: BTreeMap<String, BTreeMap<String, u8>>) -> Self {
        Self(services)
    }

    /// Returns `true` if `privilege` is granted for `service`.
    #[must_use]
    pub fn has(&self, service: &str, privilege: &str) -> bool {
        self.0
            .get(service)
            .and_then(|privileges| privileges.get(privilege))
            .is_some_and(|granted| *granted != 0)
    }

    /// Returns the privileges listed for `service`.
    pub fn service(&self, service: &str) -> Option<&BTreeMap<String, u8>> {
        self.0.get(service)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An authenticated session.
///
/// Issued by a successful login and never modified afterwards; logging in
/// again produces a new value.
#[derive(Debug, Clone)]
pub struct ProxmoxAuth {
    ticket: ProxmoxTicket,
    csrf_token: ProxmoxCSRFToken,
    username: Option<String>,
    capabilities: Capabilities,
}

impl ProxmoxAuth {
    pub fn new(ticket: ProxmoxTicket, csrf_token: ProxmoxCSRFToken) -> Self {
        Self {
            ticket,
            csrf_token,
            username: None,
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn ticket(&self) -> &ProxmoxTicket {
        &self.ticket
    }

    pub fn csrf_token(&self) -> &ProxmoxCSRFToken {
        &self.csrf_token
    }

    /// The `user@realm` the remote authenticated, when reported.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}
