//! Account endpoints.

use rc_core::error::RcResult;
use tracing::info;

use crate::client::ApiClient;
use crate::response::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};

/// Role assigned to self-registered accounts.
pub const DEFAULT_ROLE_ID: i64 = 1;

impl ApiClient {
    /// Exchange credentials for an access token.
    pub async fn login(&self, email: &str, password: &str) -> RcResult<AuthResponse> {
        let body = serde_json::to_value(LoginRequest { email, password })?;
        let resp: AuthResponse = self.post_json("/auth/login", &body).await?;
        info!("logged in as {email}");
        Ok(resp)
    }

    /// Create an account. `role_id` defaults to [`DEFAULT_ROLE_ID`].
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role_id: Option<i64>,
    ) -> RcResult<UserProfile> {
        let body = serde_json::to_value(RegisterRequest {
            email,
            password,
            role_id: role_id.unwrap_or(DEFAULT_ROLE_ID),
        })?;
        self.post_json("/auth/register", &body).await
    }

    /// Profile of the account owning `token`.
    pub async fn profile(&self, token: &str) -> RcResult<UserProfile> {
        self.get_json("/auth/me", Some(token)).await
    }
}
