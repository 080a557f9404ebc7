//! Authentication against the Supabase auth (GoTrue) API

mod listeners;
mod session;
mod storage;
mod types;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::{api_error, Fetch};

pub use listeners::*;
pub use session::*;
pub use storage::*;
pub use types::*;

/// The auth operations the session manager relies on
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The persisted session, if any, refreshed when it has expired
    async fn get_session(&self) -> Result<Option<Session>, Error>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, Error>;

    async fn sign_out(&self) -> Result<(), Error>;

    /// Register for auth state changes pushed by the backend
    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription;
}

/// Client for Supabase Authentication
pub struct Auth {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// Client options
    options: ClientOptions,

    /// Where the current session lives
    storage: Arc<dyn SessionStorage>,

    /// Auth state subscribers
    listeners: Arc<AuthListeners>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        let storage = storage::session_storage(&options);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            options,
            storage,
            listeners: AuthListeners::new(),
        }
    }

    /// Replace the session storage
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        self
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// The stored session, without any expiry handling
    pub fn current_session(&self) -> Result<Option<Session>, Error> {
        self.storage.load()
    }

    fn store(&self, mut session: Session, event: AuthChangeEvent) -> Result<Session, Error> {
        session.stamp_expiry();
        self.storage.save(&session)?;
        self.listeners.emit(event, Some(&session));
        Ok(session)
    }

    fn forget(&self) -> Result<(), Error> {
        self.storage.clear()?;
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    /// Exchange a refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session, Error> {
        let current = self.current_session()?.ok_or(Error::NotAuthenticated)?;
        self.refresh_with(&current.refresh_token).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, Error> {
        let url = self.get_auth_url("/token?grant_type=refresh_token");

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&json!({ "refresh_token": refresh_token }))?
            .execute::<Session>()
            .await?;

        info!("Session refreshed for user {}", session.user.id);
        self.store(session, AuthChangeEvent::TokenRefreshed)
    }
}

#[async_trait]
impl AuthBackend for Auth {
    async fn get_session(&self) -> Result<Option<Session>, Error> {
        let session = match self.current_session()? {
            Some(session) => session,
            None => return Ok(None),
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }

        if !self.options.auto_refresh_token {
            debug!("Stored session expired and auto refresh is off");
            self.forget()?;
            return Ok(None);
        }

        match self.refresh_with(&session.refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!("Failed to refresh stored session: {}", err);
                self.forget()?;
                Err(err)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error> {
        let url = self.get_auth_url("/token?grant_type=password");

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&PasswordCredentials { email, password })?
            .execute::<Session>()
            .await?;

        info!("Signed in as user {}", session.user.id);
        self.store(session, AuthChangeEvent::SignedIn)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, Error> {
        let url = self.get_auth_url("/signup");

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&PasswordCredentials { email, password })?
            .execute::<SignUpResponse>()
            .await?;

        match response {
            SignUpResponse::Session(session) => {
                info!("Signed up and signed in as user {}", session.user.id);
                let session = self.store(session, AuthChangeEvent::SignedIn)?;
                Ok(SignUpResponse::Session(session))
            }
            SignUpResponse::User(user) => {
                info!("Signed up user {}; confirmation pending", user.id);
                Ok(SignUpResponse::User(user))
            }
        }
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let session = match self.current_session()? {
            Some(session) => session,
            None => return self.forget(),
        };

        let url = self.get_auth_url("/logout");

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .execute_raw()
            .await?;

        let status = response.status();
        // the token is already gone server side
        let already_invalid = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND);
        if !status.is_success() && !already_invalid {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        info!("Signed out user {}", session.user.id);
        self.forget()
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription {
        self.listeners.subscribe(callback)
    }
}
