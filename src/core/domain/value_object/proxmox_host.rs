use crate::core::domain::error::ValidationError;
use std::net::IpAddr;
use tokio::time::Duration;

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated Proxmox host address (DNS name or IP literal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxHost(String);

impl ProxmoxHost {
    /// Creates a new host without validation.
    pub(crate) fn new_unchecked(host: String) -> Self {
        Self(host)
    }

    /// Returns the host as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates a hostname according to RFC 1035 label rules.
///
/// IP literals are accepted as-is.
pub(crate) fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::Field {
            field: "host".to_string(),
            message: "Host cannot be empty".to_string(),
        });
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::ConstraintViolation(format!(
            "Host length exceeds maximum of {} characters",
            MAX_HOSTNAME_LENGTH
        )));
    }
    for label in host.split('.') {
        validate_label(label)?;
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::Format(format!(
            "Label must be between 1 and {} characters",
            MAX_LABEL_LENGTH
        )));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::Format(
            "Label can only contain alphanumeric characters and hyphens".to_string(),
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::Format(
            "Label cannot start or end with hyphen".to_string(),
        ));
    }
    Ok(())
}

/// Resolves the host to make sure it has at least one address.
pub(crate) async fn resolve_host(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(), ValidationError> {
    match tokio::time::timeout(timeout, tokio::net::lookup_host((host, port))).await {
        Ok(lookup_result) => {
            let mut addresses = lookup_result.map_err(|e| {
                ValidationError::ConstraintViolation(format!("DNS resolution failed: {}", e))
            })?;
            if addresses.next().is_none() {
                return Err(ValidationError::ConstraintViolation(
                    "No DNS records found".to_string(),
                ));
            }
            Ok(())
        }
        Err(_) => Err(ValidationError::ConstraintViolation(
            "DNS resolution timeout".to_string(),
        )),
    }
}
