//! Wire types for the account endpoints.

use crate::shared::UserId;
use serde::{Deserialize, Serialize};

/// Body for `/signup` and `/signin`. `name` is only used on signup.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response from `/signup` and `/signin`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
}
