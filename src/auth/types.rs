//! Types for authentication and user management

use serde::{Deserialize, Serialize};

use super::Session;

/// User data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    pub email: Option<String>,

    /// The user's phone number
    pub phone: Option<String>,

    /// The user's role
    pub role: Option<String>,

    /// When the email was confirmed
    pub email_confirmed_at: Option<String>,

    /// The creation time
    pub created_at: Option<String>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Email/password credentials sent to the token and signup endpoints
#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of the signup endpoint.
///
/// Projects with email confirmation enabled answer with the bare user record;
/// otherwise a full session is returned.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(User),
}

impl SignUpResponse {
    pub fn user(&self) -> &User {
        match self {
            SignUpResponse::Session(session) => &session.user,
            SignUpResponse::User(user) => user,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SignUpResponse::Session(session) => Some(session),
            SignUpResponse::User(_) => None,
        }
    }
}

/// Auth state transitions pushed to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}
