//! Account sub-client — signup and signin.

use crate::client::TrackerClient;
use crate::error::{HttpError, SdkError};
use crate::session::wire::CredentialsRequest;
use crate::shared::UserId;

/// Sub-client for the account endpoints.
///
/// Returns the allocated [`UserId`] on success; storing it into a session
/// provider is the application's call.
pub struct Sessions<'a> {
    pub(crate) client: &'a TrackerClient,
}

impl<'a> Sessions<'a> {
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<UserId, SdkError> {
        let resp = self
            .client
            .http
            .signup(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: Some(name.to_string()),
            })
            .await?;

        resp.user_id
            .ok_or_else(|| SdkError::Other(format!("signup succeeded without a user id: {}", resp.message)))
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<UserId, SdkError> {
        let resp = self
            .client
            .http
            .signin(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: None,
            })
            .await?;

        resp.user_id.ok_or_else(|| HttpError::Unauthorized.into())
    }
}
