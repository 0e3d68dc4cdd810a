use crate::core::domain::error::ValidationError;

/// A validated authentication realm identifier (`pam`, `pve`, or a
/// configured LDAP/AD/OpenID realm).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxRealm(String);

impl ProxmoxRealm {
    /// Creates a new realm without validation.
    pub(crate) fn new_unchecked(realm: String) -> Self {
        Self(realm)
    }

    /// Returns the realm as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates a realm identifier.
///
/// Realm IDs are admin-defined, so only their shape is checked.
pub(crate) fn validate_realm(realm: &str) -> Result<(), ValidationError> {
    if realm.is_empty() {
        return Err(ValidationError::Field {
            field: "realm".to_string(),
            message: "Realm cannot be empty".to_string(),
        });
    }
    if realm.len() > 32 {
        return Err(ValidationError::Format(
            "Realm cannot exceed 32 characters".to_string(),
        ));
    }
    if !realm.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::Format(
            "Realm must start with a letter".to_string(),
        ));
    }
    if !realm
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::Format(
            "Realm contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
