//! In-memory backends for unit tests

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::auth::{
    AuthBackend, AuthCallback, AuthChangeEvent, AuthListeners, AuthSubscription, Session,
    SignUpResponse,
};
use crate::error::Error;
use crate::events::{Event, EventChanges, EventId, EventStore, NewEvent};

pub fn session(user_id: &str) -> Session {
    serde_json::from_value(json!({
        "access_token": format!("token-{}", user_id),
        "refresh_token": format!("refresh-{}", user_id),
        "expires_in": 3600,
        "user": { "id": user_id, "email": format!("{}@example.com", user_id) }
    }))
    .unwrap()
}

pub fn event(id: i64, user_id: &str, name: &str, date: &str) -> Event {
    Event {
        id: EventId(id),
        user_id: user_id.to_string(),
        name: name.to_string(),
        date: date.parse().unwrap(),
        location: None,
        description: None,
        created_at: None,
    }
}

fn rejected(message: &str) -> Error {
    Error::api(StatusCode::BAD_REQUEST, message)
}

/// Auth backend holding a single session in memory
#[derive(Default)]
pub struct FakeAuth {
    pub listeners: Arc<AuthListeners>,
    pub stored: Mutex<Option<Session>>,
    pub fail_with: Mutex<Option<String>>,
    pub confirm_email: bool,
    pub get_session_calls: AtomicUsize,
    /// When set, `get_session` waits for a permit after reading the stored session
    pub gate: Option<Arc<Notify>>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_stored(session: Session) -> Arc<Self> {
        let auth = Self::default();
        *auth.stored.lock().unwrap() = Some(session);
        Arc::new(auth)
    }

    pub fn gated(session: Session, gate: Arc<Notify>) -> Arc<Self> {
        let auth = Self {
            gate: Some(gate),
            ..Default::default()
        };
        *auth.stored.lock().unwrap() = Some(session);
        Arc::new(auth)
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    fn check(&self) -> Result<(), Error> {
        match self.fail_with.lock().unwrap().take() {
            Some(message) => Err(rejected(&message)),
            None => Ok(()),
        }
    }

    /// Simulate a change made elsewhere, e.g. another tab signing out
    pub fn push(&self, event: AuthChangeEvent, session: Option<Session>) {
        *self.stored.lock().unwrap() = session.clone();
        self.listeners.emit(event, session.as_ref());
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn get_session(&self) -> Result<Option<Session>, Error> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let stored = self.stored.lock().unwrap().clone();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(stored)
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, Error> {
        self.check()?;
        let session = session(email.split('@').next().unwrap_or(email));
        self.push(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, Error> {
        if self.confirm_email {
            self.check()?;
            let user = session(email).user;
            return Ok(SignUpResponse::User(user));
        }
        self.sign_in_with_password(email, password)
            .await
            .map(SignUpResponse::Session)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        self.check()?;
        self.push(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription {
        self.listeners.subscribe(callback)
    }
}

/// Event table held in memory, with call counters and injectable failures
#[derive(Default)]
pub struct FakeStore {
    pub rows: Mutex<Vec<Event>>,
    pub next_id: AtomicI64,
    pub calls: AtomicUsize,
    pub fail_with: Mutex<Option<String>>,
    /// When set, writes wait for a permit before completing
    pub gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub fn with_rows(rows: Vec<Event>) -> Arc<Self> {
        let next = rows.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        Arc::new(Self {
            rows: Mutex::new(rows),
            next_id: AtomicI64::new(next),
            ..Default::default()
        })
    }

    pub fn gated(rows: Vec<Event>, gate: Arc<Notify>) -> Arc<Self> {
        let next = rows.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        Arc::new(Self {
            rows: Mutex::new(rows),
            next_id: AtomicI64::new(next),
            gate: Some(gate),
            ..Default::default()
        })
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.fail_with.lock().unwrap().take() {
            Some(message) => Err(rejected(&message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EventStore for FakeStore {
    async fn list(&self, session: &Session) -> Result<Vec<Event>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_with.lock().unwrap().take() {
            return Err(rejected(&message));
        }
        // returned in insertion order; the list sorts locally
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == session.user.id)
            .cloned()
            .collect())
    }

    async fn insert(&self, _session: &Session, event: NewEvent) -> Result<Event, Error> {
        self.enter().await?;
        let stored = Event {
            id: EventId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            user_id: event.user_id,
            name: event.changes.name,
            date: event.changes.date,
            location: event.changes.location,
            description: event.changes.description,
            created_at: None,
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        _session: &Session,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Event, Error> {
        self.enter().await?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::api(StatusCode::NOT_ACCEPTABLE, "no rows"))?;
        row.name = changes.name;
        row.date = changes.date;
        row.location = changes.location;
        row.description = changes.description;
        Ok(row.clone())
    }

    async fn delete(&self, _session: &Session, id: EventId) -> Result<(), Error> {
        self.enter().await?;
        self.rows.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }
}
