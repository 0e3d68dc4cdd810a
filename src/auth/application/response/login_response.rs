use crate::core::domain::model::proxmox_auth::Capabilities;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Deserialize)]
pub struct LoginResponseData {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub cap: Option<Capabilities>,
}
