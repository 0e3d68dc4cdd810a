mod auth;
mod core;
mod resources;


pub use crate::core::domain::{
    error::{ProxmoxError, ProxmoxResult, TaskFailure, ValidationError},
    model::{
        config::{ClientConfig, DEFAULT_API_PATH, RateLimitConfig, ValidationConfig},
        network::{Network, NetworkRequest, NetworkType},
        node::Node,
        proxmox_auth::{Capabilities, ProxmoxAuth},
        proxmox_connection::ProxmoxConnection,
        task::{TASK_EXIT_OK, Task, TaskStatus},
        vm::{VirtualMachine, VirtualMachineRequest, VmListItem, VmStatusCurrent},
    },
    value_object::{
        DELETE_PARAM, InternalDataStorage, MAX_IDE_DEVICES, Netmask, Patch, ProxmoxCSRFToken,
        ProxmoxHost, ProxmoxPassword, ProxmoxPort, ProxmoxRealm, ProxmoxTicket, ProxmoxUrl,
        ProxmoxUsername, mask_to_prefix, prefix_to_mask, validate_ide_devices,
    },
};
pub use crate::core::infrastructure::task_poller::{TaskPoller, TaskStatusSource};

use crate::core::{
    domain::value_object::{
        DEFAULT_PORT, resolve_host, validate_host, validate_password, validate_port,
        validate_realm, validate_username,
    },
    infrastructure::api_client::ApiClient,
};
use std::time::Duration;
use tracing::info;

const HOST_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// A Client for interacting with the Proxmox VE API
///
/// This client provides a typed interface for:
/// - Authentication and session management
/// - Nodes, network interfaces and QEMU virtual machines
/// - Waiting for the asynchronous tasks mutations start
///
/// Every mutating operation blocks until the remote task it started has
/// stopped, then returns a fresh read of the resource.
///
/// # Examples
///
/// ```no_run
/// use proxmox_api::{ProxmoxClient, ProxmoxResult};
///
/// #[tokio::main]
/// async fn main() -> ProxmoxResult<()> {
///     let client = ProxmoxClient::builder()
///         .host("proxmox.example.com")
///         .port(8006)
///         .credentials("root", "password", "pam")
///         .secure(true)
///         .accept_invalid_certs(true)
///         .build()
///         .await?;
///
///     client.login().await?;
///     for node in client.nodes().await? {
///         println!("{} is {}", node.name, node.status);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ProxmoxClient {
    pub(crate) api_client: ApiClient,
    pub(crate) config: ClientConfig,
}

/// Builder for ProxmoxClient configuration
///
/// Nothing is validated until [`build`](ProxmoxClientBuilder::build).
#[derive(Debug, Default)]
pub struct ProxmoxClientBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    realm: Option<String>,
    secure: bool,
    accept_invalid_certs: bool,
    config: ClientConfig,
}

impl ProxmoxClientBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self.realm = Some(realm.into());
        self
    }

    /// Use `https`. Defaults to `false`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Skip certificate verification, for self-signed management endpoints.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the settings and builds an unauthenticated client.
    ///
    /// # Errors
    /// `ProxmoxError::Validation` for a missing or malformed setting, or an
    /// unresolvable host when [`ValidationConfig::resolve_host`] is on.
    pub async fn build(self) -> ProxmoxResult<ProxmoxClient> {
        let policy = &self.config.validation;

        let host = required("host", self.host)?;
        validate_host(&host)?;
        let port = self.port.unwrap_or(DEFAULT_PORT);
        validate_port(port)?;
        if policy.resolve_host {
            resolve_host(&host, port, HOST_RESOLVE_TIMEOUT).await?;
        }

        let username = required("username", self.username)?;
        validate_username(&username, policy.block_reserved_usernames)?;
        let password = required("password", self.password)?;
        validate_password(&password, policy.password_min_score)?;
        let realm = required("realm", self.realm)?;
        validate_realm(&realm)?;

        let host = ProxmoxHost::new_unchecked(host);
        let port = ProxmoxPort::new_unchecked(port);
        let url = ProxmoxUrl::from_parts(&host, port, self.secure)?;
        let connection = ProxmoxConnection::new(
            host,
            port,
            ProxmoxUsername::new_unchecked(username),
            ProxmoxPassword::new_unchecked(password),
            ProxmoxRealm::new_unchecked(realm),
            self.secure,
            self.accept_invalid_certs,
            url,
        );

        let api_client = ApiClient::new(connection, &self.config)?;
        Ok(ProxmoxClient {
            api_client,
            config: self.config,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    value.ok_or_else(|| ValidationError::Field {
        field: field.to_string(),
        message: format!("{} is required", field),
    })
}

impl ProxmoxClient {
    /// Creates a new builder for ProxmoxClient configuration
    pub fn builder() -> ProxmoxClientBuilder {
        ProxmoxClientBuilder::default()
    }

    /// Authenticates with the Proxmox server
    ///
    /// Replaces any existing session with a new one. Calling this is optional:
    /// the first API call logs in by itself when there is no session yet.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the server answers with a non-2xx status
    /// - `Connection` if the server is unreachable
    /// - `Decode` or `Validation` if the ticket in the response is malformed
    pub async fn login(&self) -> ProxmoxResult<()> {
        let auth = self.api_client.login().await?;
        info!(
            host = %self.api_client.connection().host().as_str(),
            username = ?auth.username(),
            "session established"
        );
        Ok(())
    }

    /// Returns true if the client holds a session
    pub async fn is_authenticated(&self) -> bool {
        self.api_client.auth().await.is_some()
    }

    /// Returns the current session ticket if authenticated
    pub async fn auth_token(&self) -> Option<ProxmoxTicket> {
        self.api_client
            .auth()
            .await
            .map(|auth| auth.ticket().clone())
    }

    /// Returns the current CSRF token if authenticated
    pub async fn csrf_token(&self) -> Option<ProxmoxCSRFToken> {
        self.api_client
            .auth()
            .await
            .map(|auth| auth.csrf_token().clone())
    }

    /// Returns the whole current session, capabilities included
    pub async fn session(&self) -> Option<ProxmoxAuth> {
        self.api_client.auth().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection(&self) -> &ProxmoxConnection {
        self.api_client.connection()
    }
}
