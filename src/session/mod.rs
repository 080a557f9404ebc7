//! Application-wide authentication state

mod state;

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, OnceCell};

use crate::auth::{AuthBackend, AuthChangeEvent, AuthSubscription, Session, User};
use crate::config::DEFAULT_LOGIN_PATH;
use crate::notify::Notifier;

pub use state::*;

/// Owns the session state for the lifetime of the application.
///
/// State is published through a [`watch`] channel and is only ever changed by
/// the manager itself or by the auth backend's push callback.
pub struct SessionManager {
    auth: Arc<dyn AuthBackend>,
    notifier: Notifier,
    state: Arc<watch::Sender<SessionState>>,
    subscription: Mutex<Option<AuthSubscription>>,
    resolved: OnceCell<()>,
    login_path: String,
}

impl SessionManager {
    /// Create the manager and subscribe to the backend's auth changes.
    ///
    /// The state starts unresolved; call [`SessionManager::resolve`] to load any
    /// persisted session.
    pub fn start(auth: Arc<dyn AuthBackend>, notifier: Notifier) -> Self {
        let (sender, _) = watch::channel(SessionState::default());
        let state = Arc::new(sender);

        let pushed = Arc::clone(&state);
        let subscription = auth.on_auth_state_change(Box::new(
            move |event: AuthChangeEvent, session: Option<&Session>| {
                debug!("Auth state change: {:?}", event);
                pushed.send_if_modified(|state| state.apply(event, session));
            },
        ));

        Self {
            auth,
            notifier,
            state,
            subscription: Mutex::new(Some(subscription)),
            resolved: OnceCell::new(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Set where [`SessionManager::guard`] redirects unauthenticated access
    pub fn with_login_path(mut self, login_path: &str) -> Self {
        self.login_path = login_path.to_string();
        self
    }

    /// Load the persisted session. Only the first call talks to the backend.
    pub async fn resolve(&self) {
        self.resolved
            .get_or_init(move || async move {
                let session = match self.auth.get_session().await {
                    Ok(session) => session,
                    Err(err) => {
                        warn!("Could not restore session: {}", err);
                        None
                    }
                };
                match &session {
                    Some(session) => info!("Restored session for user {}", session.user.id),
                    None => debug!("No stored session"),
                }
                // a push that landed during the lookup is newer than what we read
                self.state.send_if_modified(|state| {
                    if state.resolved {
                        return false;
                    }
                    state.settle(session.as_ref())
                });
            })
            .await;
    }

    /// Sign in with email and password.
    ///
    /// The new session arrives through the auth push channel; the return value
    /// only tells the caller whether to move on.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        if email.trim().is_empty() || password.is_empty() {
            self.notifier
                .failure("Login Failed", "Email and password are required.");
            return false;
        }

        self.begin_transition();
        match self.auth.sign_in_with_password(email.trim(), password).await {
            Ok(_) => {
                self.notifier.success("Login Successful", "Welcome back!");
                true
            }
            Err(err) => {
                self.end_transition();
                self.notifier.failure("Login Failed", err.to_string());
                false
            }
        }
    }

    /// Register a new account. Success means the backend accepted the request;
    /// the address may still need confirming.
    pub async fn signup(&self, email: &str, password: &str) -> bool {
        if email.trim().is_empty() || password.is_empty() {
            self.notifier
                .failure("Signup Failed", "Email and password are required.");
            return false;
        }

        self.begin_transition();
        match self.auth.sign_up(email.trim(), password).await {
            Ok(response) => {
                if response.session().is_none() {
                    self.end_transition();
                }
                self.notifier.success(
                    "Signup Successful",
                    "Please check your email to verify your account.",
                );
                true
            }
            Err(err) => {
                self.end_transition();
                self.notifier.failure("Signup Failed", err.to_string());
                false
            }
        }
    }

    /// Sign out. Local state is only cleared once the backend agrees.
    pub async fn logout(&self) -> bool {
        self.begin_transition();
        match self.auth.sign_out().await {
            Ok(()) => {
                self.state
                    .send_if_modified(|state| state.apply(AuthChangeEvent::SignedOut, None));
                self.notifier
                    .success("Logged Out", "You have been successfully logged out.");
                true
            }
            Err(err) => {
                self.end_transition();
                self.notifier.failure("Logout Failed", err.to_string());
                false
            }
        }
    }

    fn begin_transition(&self) {
        self.state.send_if_modified(SessionState::begin_transition);
    }

    fn end_transition(&self) {
        self.state.send_if_modified(SessionState::end_transition);
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Observe every state change
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Decide what an identity-gated view may show right now
    pub fn guard(&self) -> Access {
        self.state.borrow().access(&self.login_path)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Stop listening to the backend. Safe to call more than once.
    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            debug!("Releasing auth subscription {}", subscription.id());
            subscription.unsubscribe();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests;
