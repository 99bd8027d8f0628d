use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// JWT payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub exp: i64,    // expires at (unix timestamp)
    pub iat: i64,    // issued at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Signed access token handed to the client.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Opaque refresh token. Generated but not handed out by login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub expires_at: OffsetDateTime,
}
