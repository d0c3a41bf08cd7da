use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo::User;

/// JWT payload: user identity plus issued-at/expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user ID
    pub username: String, // normalized username at issuance time
    pub iat: usize,       // issued at
    pub exp: usize,       // expiration time
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login. `username` may hold a username or an email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

/// Soft verification result; always returned with a 200 status.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerifyResponse {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            user: None,
            message: Some(message.into()),
        }
    }

    pub fn valid(user: PublicUser) -> Self {
        Self {
            valid: true,
            user: Some(user),
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> PublicUser {
        PublicUser {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn public_user_never_serializes_a_password() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn invalid_verify_response_omits_user() {
        let json = serde_json::to_value(VerifyResponse::invalid("No token provided")).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["message"], "No token provided");
        assert!(json.get("user").is_none());
    }

    #[test]
    fn valid_verify_response_omits_message() {
        let json = serde_json::to_value(VerifyResponse::valid(sample_user())).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["user"]["username"], "ada");
        assert!(json.get("message").is_none());
    }
}
