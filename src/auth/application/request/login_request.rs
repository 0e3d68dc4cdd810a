use serde::Serialize;
use std::fmt;

/// Form body of `POST access/ticket`.
#[derive(Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub realm: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .field("realm", &self.realm)
            .finish()
    }
}
