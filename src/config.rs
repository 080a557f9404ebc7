//! Configuration for the event planner client

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::Error;

/// Table holding the event rows
pub const DEFAULT_EVENTS_TABLE: &str = "events";

/// Where unauthenticated users are sent by the route guard
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Project coordinates for the hosted backend
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// The base URL for the Supabase project
    pub url: Url,
    /// The anonymous API key for the Supabase project
    pub anon_key: String,
}

impl ProjectConfig {
    /// Creates a new configuration, validating the URL and key.
    pub fn new(url: &str, anon_key: &str) -> Result<Self, Error> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
        })
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY` (or `SUPABASE_KEY`),
    /// loading a `.env` file first when one exists.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let url = env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let key = env::var("SUPABASE_ANON_KEY")
            .or_else(|_| env::var("SUPABASE_KEY"))
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        Self::new(&url, &key)
    }

    /// The project URL without a trailing slash, ready for path concatenation
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

/// Configuration options for the event planner client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to refresh an expired stored session on startup
    pub auto_refresh_token: bool,

    /// Whether to keep the session in `session_file` between runs
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The table holding event rows
    pub events_table: String,

    /// File used to persist the session
    pub session_file: Option<PathBuf>,

    /// Redirect target for unauthenticated access
    pub login_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            events_table: DEFAULT_EVENTS_TABLE.to_string(),
            session_file: None,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientOptions {
    /// Apply `EVENT_PLANNER_TABLE` and `EVENT_PLANNER_SESSION_FILE` when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(table) = env::var("EVENT_PLANNER_TABLE") {
            if !table.trim().is_empty() {
                self.events_table = table;
            }
        }
        if let Ok(path) = env::var("EVENT_PLANNER_SESSION_FILE") {
            if !path.trim().is_empty() {
                self.session_file = Some(PathBuf::from(path));
            }
        }
        self
    }

    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the events table
    pub fn with_events_table(mut self, value: &str) -> Self {
        self.events_table = value.to_string();
        self
    }

    /// Set the session file
    pub fn with_session_file(mut self, value: Option<PathBuf>) -> Self {
        self.session_file = value;
        self
    }

    /// Set the login path used by the route guard
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }
}
