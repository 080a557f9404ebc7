//! Session data returned by the auth API

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::User;
use crate::error::Error;

/// Sessions this close to expiry are treated as expired
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The expiry timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The authenticated user
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

/// Read the `exp` claim of an access token without verifying its signature
pub fn token_expiry(token: &str) -> Result<i64, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims.exp)
}

impl Session {
    /// Fill in `expires_at` when the API only sent `expires_in`.
    ///
    /// The token's own `exp` claim wins over the relative lifetime.
    pub fn stamp_expiry(&mut self) {
        if self.expires_at.is_none() {
            let expires_at = token_expiry(&self.access_token)
                .unwrap_or_else(|_| now_secs() + self.expires_in);
            self.expires_at = Some(expires_at);
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() + EXPIRY_MARGIN_SECS >= expires_at,
            None => false,
        }
    }
}
