use crate::core::domain::value_object::{
    ProxmoxHost, ProxmoxPassword, ProxmoxPort, ProxmoxRealm, ProxmoxUrl, ProxmoxUsername,
};

/// Where and as whom the client connects.
///
/// All parts are validated by the client builder before this is assembled.
#[derive(Debug, Clone)]
pub struct ProxmoxConnection {
    host: ProxmoxHost,
    port: ProxmoxPort,
    username: ProxmoxUsername,
    password: ProxmoxPassword,
    realm: ProxmoxRealm,
    secure: bool,
    accept_invalid_certs: bool,
    url: ProxmoxUrl,
}

impl ProxmoxConnection {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: ProxmoxHost,
        port: ProxmoxPort,
        username: ProxmoxUsername,
        password: ProxmoxPassword,
        realm: ProxmoxRealm,
        secure: bool,
        accept_invalid_certs: bool,
        url: ProxmoxUrl,
    ) -> Self {
        Self {
            host,
            port,
            username,
            password,
            realm,
            secure,
            accept_invalid_certs,
            url,
        }
    }

    pub fn host(&self) -> &ProxmoxHost {
        &self.host
    }

    pub fn port(&self) -> ProxmoxPort {
        self.port
    }

    pub fn username(&self) -> &ProxmoxUsername {
        &self.username
    }

    pub fn password(&self) -> &ProxmoxPassword {
        &self.password
    }

    pub fn realm(&self) -> &ProxmoxRealm {
        &self.realm
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Whether certificate verification is disabled for this endpoint.
    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn url(&self) -> &ProxmoxUrl {
        &self.url
    }
}
