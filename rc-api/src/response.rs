//! Request and response bodies of the backend REST API.

use serde::{Deserialize, Serialize};

/// Token issued by `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Account returned by `/auth/me` and `/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub role_id: i64,
    #[serde(default)]
    pub created_at: String,
}

impl UserProfile {
    /// Display name derived from the email's local part.
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub role_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_default_token_type() {
        let resp: AuthResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(resp.access_token, "abc");
        assert_eq!(resp.token_type, "bearer");
    }

    #[test]
    fn test_user_profile_deserialize() {
        let json = r#"{"user_id":7,"email":"cook@example.com","role_id":1,"created_at":"2024-01-01T00:00:00"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.display_name(), "cook");
    }

    #[test]
    fn test_register_request_serialize() {
        let req = RegisterRequest {
            email: "a@b.com",
            password: "pw",
            role_id: 1,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["role_id"], 1);
    }
}
