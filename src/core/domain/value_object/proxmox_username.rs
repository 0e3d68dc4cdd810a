use crate::core::domain::error::ValidationError;

const RESERVED_USERNAMES: [&str; 6] = [
    "root",
    "admin",
    "administrator",
    "nobody",
    "guest",
    "www-data",
];

/// A validated Proxmox username, without the `@realm` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxUsername(String);

impl ProxmoxUsername {
    /// Creates a new username without validation.
    pub(crate) fn new_unchecked(username: String) -> Self {
        Self(username)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates a username. Reserved system accounts are only rejected when
/// `block_reserved` is set.
pub(crate) fn validate_username(
    username: &str,
    block_reserved: bool,
) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.len() > 64 {
        return Err(ValidationError::Format(format!(
            "Username cannot exceed 64 characters (got {})",
            username.len()
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !username.chars().all(allowed) {
        return Err(ValidationError::Format(
            "Username contains invalid characters. Allowed: alphanumeric, -, _, .".to_string(),
        ));
    }
    if block_reserved && RESERVED_USERNAMES.contains(&username) {
        return Err(ValidationError::ConstraintViolation(
            "Username is reserved".to_string(),
        ));
    }
    Ok(())
}
