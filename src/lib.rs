//! Event planner client library
//!
//! Keeps a signed-in user's personal events in sync with a Supabase project:
//! a [`SessionManager`](session::SessionManager) owns the authentication state
//! and an [`EventList`](events::EventList) mirrors the user's rows from the
//! events table, sorted by date.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod notify;
pub mod postgrest;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use reqwest::Client;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::Auth;
use crate::config::{ClientOptions, ProjectConfig};
use crate::error::Error;
use crate::events::{EventList, PostgrestEventStore};
use crate::notify::{Notification, Notifier};
use crate::postgrest::PostgrestClient;
use crate::session::SessionManager;

/// The main entry point for the event planner
pub struct EventPlanner {
    /// Project URL and key
    pub config: ProjectConfig,
    /// Client options
    pub options: ClientOptions,
    /// HTTP client used for requests
    pub http_client: Client,
    auth: Arc<Auth>,
    notifier: Notifier,
    session: SessionManager,
    events: EventList,
}

impl EventPlanner {
    /// Create a new client with default options
    ///
    /// # Example
    ///
    /// ```
    /// use event_planner::EventPlanner;
    ///
    /// let planner = EventPlanner::new("https://your-project-url.supabase.co", "your-anon-key")
    ///     .unwrap();
    /// assert!(planner.session().is_loading());
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Result<Self, Error> {
        let config = ProjectConfig::new(supabase_url, supabase_key)?;
        Self::new_with_options(config, ClientOptions::default())
    }

    /// Create a client from `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional
    /// `EVENT_PLANNER_*` overrides
    pub fn from_env() -> Result<Self, Error> {
        let config = ProjectConfig::from_env()?;
        Self::new_with_options(config, ClientOptions::default().with_env_overrides())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use event_planner::{EventPlanner, config::{ClientOptions, ProjectConfig}};
    ///
    /// let config = ProjectConfig::new("https://your-project-url.supabase.co", "your-anon-key")
    ///     .unwrap();
    /// let options = ClientOptions::default().with_events_table("planner_events");
    /// let planner = EventPlanner::new_with_options(config, options).unwrap();
    /// ```
    pub fn new_with_options(config: ProjectConfig, options: ClientOptions) -> Result<Self, Error> {
        let http_client = http_client(&options)?;

        let auth = Arc::new(Auth::new(
            &config.base_url(),
            &config.anon_key,
            http_client.clone(),
            options.clone(),
        ));
        Ok(Self::assemble(config, options, http_client, auth))
    }

    fn assemble(
        config: ProjectConfig,
        options: ClientOptions,
        http_client: Client,
        auth: Arc<Auth>,
    ) -> Self {
        let notifier = Notifier::new();
        let session = SessionManager::start(auth.clone(), notifier.clone())
            .with_login_path(&options.login_path);

        let table = PostgrestClient::new(
            &config.base_url(),
            &config.anon_key,
            &options.events_table,
            http_client.clone(),
        );
        let events = EventList::new(
            Arc::new(PostgrestEventStore::new(table)),
            session.watch(),
            notifier.clone(),
        );

        Self {
            config,
            options,
            http_client,
            auth,
            notifier,
            session,
            events,
        }
    }

    /// The auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The application-wide session state
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Receive every notification emitted from now on
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Create a PostgrestClient for a specific table
    pub fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient::new(
            &self.config.base_url(),
            &self.config.anon_key,
            table,
            self.http_client.clone(),
        )
    }

    /// The event list bound to this client's session, backed by the configured table.
    ///
    /// Every call returns the same collection; clone it to hand it to another task.
    pub fn events(&self) -> &EventList {
        &self.events
    }
}

fn http_client(options: &ClientOptions) -> Result<Client, Error> {
    let mut builder = Client::builder();
    if let Some(timeout) = options.request_timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ClientOptions, ProjectConfig};
    pub use crate::error::Error;
    pub use crate::events::{Event, EventDraft, EventId, EventList};
    pub use crate::notify::{Notification, Severity};
    pub use crate::session::{Access, SessionManager, SessionState};
    pub use crate::EventPlanner;
}
