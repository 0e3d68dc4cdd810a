use crate::core::domain::error::ValidationError;
use std::fmt;

/// Name of the cookie that carries the ticket on authenticated requests.
pub const AUTH_COOKIE_NAME: &str = "PVEAuthCookie";

/// A Proxmox authentication ticket, issued once per login.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxmoxTicket(String);

impl ProxmoxTicket {
    /// Creates a new ticket without validation.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    /// Returns the ticket value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Formats the ticket as a `Cookie` header value.
    #[must_use]
    pub fn as_cookie_header(&self) -> String {
        format!("{}={}", AUTH_COOKIE_NAME, self.0)
    }
}

impl fmt::Debug for ProxmoxTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keep the user part, hide the signature
        let prefix: String = self.0.split("::").next().unwrap_or_default().to_string();
        write!(f, "ProxmoxTicket({}::***)", prefix)
    }
}

/// Validates the format of a ticket string (`PVE:<user>@<realm>:<hex>::<signature>`).
pub(crate) fn validate_ticket(ticket: &str) -> Result<(), ValidationError> {
    if ticket.is_empty() {
        return Err(ValidationError::Field {
            field: "ticket".to_string(),
            message: "Ticket cannot be empty".to_string(),
        });
    }
    let parts: Vec<&str> = ticket.split(':').collect();
    if parts.len() < 5 || parts[0] != "PVE" {
        return Err(ValidationError::Format(
            "Invalid ticket format: must start with 'PVE:' and have at least 5 parts".to_string(),
        ));
    }
    Ok(())
}
