use crate::{
    auth::application::{
        request::login_request::LoginRequest, response::login_response::LoginResponse,
    },
    core::domain::{
        error::{ProxmoxError, ProxmoxResult},
        model::{proxmox_auth::ProxmoxAuth, proxmox_connection::ProxmoxConnection},
        value_object::{ProxmoxCSRFToken, ProxmoxTicket, validate_csrf_token, validate_ticket},
    },
};
use reqwest::{Client, header::ACCEPT};
use tracing::{debug, info, warn};

const TICKET_PATH: &str = "access/ticket";

/// Exchanges credentials for a session ticket.
///
/// The login call is the only one sent without a cookie or CSRF header. Any
/// non-2xx answer is an authentication failure; it is never retried.
pub struct LoginService {
    http_client: Client,
    api_path: String,
}

impl LoginService {
    pub fn new(http_client: Client, api_path: &str) -> Self {
        Self {
            http_client,
            api_path: api_path.to_string(),
        }
    }

    pub async fn execute(&self, connection: &ProxmoxConnection) -> ProxmoxResult<ProxmoxAuth> {
        let url = connection.url().join_api(&self.api_path, TICKET_PATH);
        let request = self.build_login_request(connection);
        debug!(url = %url, username = %request.username, realm = %request.realm, "requesting ticket");

        let response = self
            .http_client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&request)
            .send()
            .await
            .map_err(|e| ProxmoxError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxmoxError::Connection(format!("Failed to read login response: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), username = %request.username, "login rejected");
            return Err(ProxmoxError::Authentication {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        self.handle_successful_login(&body)
    }

    fn build_login_request(&self, connection: &ProxmoxConnection) -> LoginRequest {
        LoginRequest {
            username: connection.username().as_str().to_string(),
            password: connection.password().as_str().to_string(),
            realm: connection.realm().as_str().to_string(),
        }
    }

    fn handle_successful_login(&self, body: &[u8]) -> ProxmoxResult<ProxmoxAuth> {
        let login_response: LoginResponse = serde_json::from_slice(body)
            .map_err(|e| ProxmoxError::Decode(format!("Failed to parse login response: {}", e)))?;
        let data = login_response.data;

        validate_ticket(&data.ticket)?;
        validate_csrf_token(&data.csrf_token)?;

        let mut auth = ProxmoxAuth::new(
            ProxmoxTicket::new_unchecked(data.ticket),
            ProxmoxCSRFToken::new_unchecked(data.csrf_token),
        )
        .with_capabilities(data.cap.unwrap_or_default());
        if let Some(username) = data.username {
            auth = auth.with_username(username);
        }

        info!(username = ?auth.username(), "logged in");
        Ok(auth)
    }
}
