use crate::core::domain::{
    error::ValidationError,
    value_object::{ProxmoxHost, ProxmoxPort},
};

/// The base URL of a Proxmox API endpoint, e.g. `https://pve.example.com:8006/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxUrl(String);

impl ProxmoxUrl {
    /// Creates a new URL without validation.
    pub(crate) fn new_unchecked(url: String) -> Self {
        Self(url)
    }

    /// Builds and validates the base URL for a host and port.
    pub(crate) fn from_parts(
        host: &ProxmoxHost,
        port: ProxmoxPort,
        secure: bool,
    ) -> Result<Self, ValidationError> {
        let scheme = if secure { "https" } else { "http" };
        let host = match host.as_str().parse::<std::net::Ipv6Addr>() {
            Ok(_) => format!("[{}]", host.as_str()),
            Err(_) => host.as_str().to_string(),
        };
        let url = format!("{}://{}:{}/", scheme, host, port.get());
        validate_url(&url)?;
        Ok(Self(url))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins the API base path and a resource path onto this URL.
    #[must_use]
    pub fn join_api(&self, api_path: &str, path: &str) -> String {
        let base = self.0.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        match api_path.trim_matches('/') {
            "" => format!("{}/{}", base, path),
            api_path => format!("{}/{}/{}", base, api_path, path),
        }
    }
}

/// Validates an absolute http(s) URL.
pub(crate) fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::Field {
            field: "url".to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }
    // RFC 7230 practical limit
    if url.len() > 2083 {
        return Err(ValidationError::Format(
            "URL exceeds maximum length of 2083 characters".to_string(),
        ));
    }
    let parsed = url::Url::parse(url)
        .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::ConstraintViolation(
            "Invalid scheme. Must be one of: https, http".to_string(),
        ));
    }
    if parsed.host().is_none() {
        return Err(ValidationError::Format("URL has no host".to_string()));
    }
    Ok(())
}
