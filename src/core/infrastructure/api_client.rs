//! Internal HTTP client that attaches the session to every API call.

use crate::{
    auth::application::service::login_service::LoginService,
    core::{
        domain::{
            error::{ProxmoxError, ProxmoxResult, ValidationError},
            model::{
                config::ClientConfig, proxmox_auth::ProxmoxAuth,
                proxmox_connection::ProxmoxConnection, task::Task,
            },
            value_object::CSRF_HEADER_NAME,
        },
        infrastructure::task_poller::TaskStatusSource,
    },
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, Method, header::COOKIE};
use serde::{Serialize, de::DeserializeOwned};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use urlencoding::encode;

/// The `{"data": ...}` envelope every API response is wrapped in.
#[derive(serde::Deserialize)]
struct ApiResponse<T> {
    data: T,
}

/// Request executor for the Proxmox API.
///
/// Every call goes through [`ApiClient::execute`], which adds the
/// `PVEAuthCookie` cookie and the `CSRFPreventionToken` header, reads the
/// response body once and turns a non-2xx status into
/// [`ProxmoxError::Request`]. Nothing is retried.
///
/// If no session exists when the first call is made, a login is performed
/// first. The session is never refreshed afterwards; an expired ticket shows
/// up as a `401` request error.
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    connection: Arc<ProxmoxConnection>,
    auth: Arc<RwLock<Option<ProxmoxAuth>>>,
    api_path: String,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`. The client starts unauthenticated.
    ///
    /// # Errors
    /// Returns `ProxmoxError::Connection` if the HTTP client cannot be built,
    /// and `ProxmoxError::Validation` for a rate limit with a zero component.
    pub fn new(connection: ProxmoxConnection, config: &ClientConfig) -> ProxmoxResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(connection.accepts_invalid_certs())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProxmoxError::Connection(e.to_string()))?;

        let rate_limiter = match config.rate_limit {
            Some(rl) => {
                let per_second = NonZeroU32::new(rl.requests_per_second).ok_or_else(|| {
                    ValidationError::Field {
                        field: "rate_limit.requests_per_second".to_string(),
                        message: "must be greater than zero".to_string(),
                    }
                })?;
                let burst = NonZeroU32::new(rl.burst_size).ok_or_else(|| ValidationError::Field {
                    field: "rate_limit.burst_size".to_string(),
                    message: "must be greater than zero".to_string(),
                })?;
                let quota = Quota::per_second(per_second).allow_burst(burst);
                Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
            }
            None => None,
        };

        Ok(Self {
            http_client,
            connection: Arc::new(connection),
            auth: Arc::new(RwLock::new(None)),
            api_path: config.api_path.clone(),
            rate_limiter,
        })
    }

    /// Returns a reference to the underlying connection details.
    pub fn connection(&self) -> &ProxmoxConnection {
        &self.connection
    }

    /// Replaces the session.
    pub async fn set_auth(&self, auth: ProxmoxAuth) {
        let mut lock = self.auth.write().await;
        *lock = Some(auth);
    }

    /// Returns the current session, if any.
    pub async fn auth(&self) -> Option<ProxmoxAuth> {
        self.auth.read().await.clone()
    }

    /// Logs in with the connection's credentials and stores the new session.
    pub async fn login(&self) -> ProxmoxResult<ProxmoxAuth> {
        let auth = self.login_service().execute(&self.connection).await?;
        self.set_auth(auth.clone()).await;
        Ok(auth)
    }

    fn login_service(&self) -> LoginService {
        LoginService::new(self.http_client.clone(), &self.api_path)
    }

    /// Performs an authenticated GET request and returns the `data` member.
    pub async fn get<T>(&self, path: &str) -> ProxmoxResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, None::<&()>).await
    }

    /// Performs an authenticated POST request with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ProxmoxResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Performs an authenticated PUT request with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ProxmoxResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Performs an authenticated DELETE request.
    pub async fn delete<T>(&self, path: &str) -> ProxmoxResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Executes a call and decodes the `data` member of the response.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ProxmoxResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(method, path, body).await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            ProxmoxError::Decode(format!("Failed to parse response of '{}': {}", path, e))
        })?;
        Ok(envelope.data)
    }

    /// Executes a call and returns the raw response body.
    ///
    /// `Content-Type: application/json` is only set when `body` is present.
    pub async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ProxmoxResult<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let auth = self.ensure_authenticated().await?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.connection.url().join_api(&self.api_path, path);
        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header(COOKIE, auth.ticket().as_cookie_header())
            .header(CSRF_HEADER_NAME, auth.csrf_token().as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProxmoxError::Connection(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProxmoxError::Connection(format!("Failed to read response: {}", e)))?;

        debug!(%method, path, status = status.as_u16(), len = bytes.len(), "api response");

        if !status.is_success() {
            return Err(ProxmoxError::Request {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes.to_vec())
    }

    /// Returns the current session, logging in first if there is none.
    async fn ensure_authenticated(&self) -> ProxmoxResult<ProxmoxAuth> {
        if let Some(auth) = self.auth.read().await.as_ref() {
            return Ok(auth.clone());
        }

        let mut lock = self.auth.write().await;
        // another caller may have logged in while we waited for the lock
        if let Some(auth) = lock.as_ref() {
            return Ok(auth.clone());
        }
        info!(host = %self.connection.host().as_str(), "no session yet, logging in");
        let auth = self.login_service().execute(&self.connection).await?;
        *lock = Some(auth.clone());
        Ok(auth)
    }
}

#[async_trait]
impl TaskStatusSource for ApiClient {
    async fn task_status(&self, node: &str, upid: &str) -> ProxmoxResult<Task> {
        self.get(&format!("nodes/{}/tasks/{}/status", encode(node), encode(upid)))
            .await
    }
}
