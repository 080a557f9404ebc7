//! The current user's events, kept in date order and in step with the backend

mod in_flight;
mod model;
mod store;

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::auth::Session;
use crate::error::Error;
use crate::notify::Notifier;
use crate::session::SessionState;

use in_flight::InFlight;
pub use in_flight::Submission;
pub use model::*;
pub use store::*;

#[derive(Debug, Default)]
struct ListState {
    /// Sorted ascending by date
    events: Vec<Event>,
    /// User the collection belongs to
    owner: Option<String>,
    loading: bool,
    in_flight: InFlight,
}

impl ListState {
    /// Drop the collection when the settled session user differs from its owner
    fn reconcile(&mut self, session: &SessionState) {
        if session.loading {
            return;
        }
        let user_id = session.user.as_ref().map(|user| user.id.as_str());
        if self.owner.as_deref() != user_id {
            if !self.events.is_empty() {
                debug!("Session user changed; dropping {} events", self.events.len());
            }
            self.events.clear();
            self.owner = user_id.map(str::to_string);
        }
    }

    fn owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }

    fn sort(&mut self) {
        // stable: equal dates keep their current order
        self.events.sort_by_key(|event| event.date);
    }

    fn contains(&self, id: EventId) -> bool {
        self.events.iter().any(|event| event.id == id)
    }
}

/// Clears a pending submission however the mutation ends
struct SubmissionGuard {
    state: Arc<Mutex<ListState>>,
    submission: Submission,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        lock(&self.state).in_flight.finish(self.submission);
    }
}

struct LoadingGuard {
    state: Arc<Mutex<ListState>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        lock(&self.state).loading = false;
    }
}

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory collection of the signed-in user's events.
///
/// All reads and writes go through this type. Backend failures leave the
/// collection as it was and are reported through the [`Notifier`].
#[derive(Clone)]
pub struct EventList {
    store: Arc<dyn EventStore>,
    session: watch::Receiver<SessionState>,
    notifier: Notifier,
    state: Arc<Mutex<ListState>>,
}

impl EventList {
    pub fn new(
        store: Arc<dyn EventStore>,
        session: watch::Receiver<SessionState>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            session,
            notifier,
            state: Arc::new(Mutex::new(ListState::default())),
        }
    }

    /// Lock the collection after syncing it with the current session
    fn state(&self) -> MutexGuard<'_, ListState> {
        let mut state = lock(&self.state);
        state.reconcile(&self.session.borrow());
        state
    }

    fn active_session(&self) -> Result<Session, Error> {
        let state = self.session.borrow();
        if state.loading {
            return Err(Error::SessionPending);
        }
        state.session.clone().ok_or(Error::NotAuthenticated)
    }

    fn begin(&self, submission: Submission) -> Result<SubmissionGuard, Error> {
        self.state().in_flight.begin(submission)?;
        Ok(SubmissionGuard {
            state: Arc::clone(&self.state),
            submission,
        })
    }

    /// Replace the collection with the user's events from the backend
    pub async fn fetch_all(&self) -> Result<(), Error> {
        let session = self.active_session()?;
        self.state().loading = true;
        let _loading = LoadingGuard {
            state: Arc::clone(&self.state),
        };

        match self.store.list(&session).await {
            Ok(mut events) => {
                let user_id = &session.user.id;
                events.retain(|event| &event.user_id == user_id);

                let mut state = self.state();
                if !state.owned_by(user_id) {
                    debug!("Discarding events fetched for a previous session");
                    return Ok(());
                }
                state.events = events;
                state.sort();
                info!("Loaded {} events", state.events.len());
                Ok(())
            }
            Err(err) => {
                self.notifier
                    .failure("Error fetching events", err.to_string());
                Err(err)
            }
        }
    }

    /// Create an event from a draft
    pub async fn add(&self, draft: &EventDraft) -> Result<Event, Error> {
        let changes = self.validate(draft)?;
        let session = self.active_session()?;
        let _submission = self.begin(Submission::New)?;

        let new_event = NewEvent {
            changes,
            user_id: session.user.id.clone(),
        };
        match self.store.insert(&session, new_event).await {
            Ok(event) => {
                let mut state = self.state();
                if state.owned_by(&event.user_id) {
                    state.events.push(event.clone());
                    state.sort();
                }
                drop(state);
                self.notifier.success("Success", "Event added successfully!");
                Ok(event)
            }
            Err(err) => {
                self.notifier.failure("Error adding event", err.to_string());
                Err(err)
            }
        }
    }

    /// Replace every editable field of an existing event
    pub async fn update(&self, id: EventId, draft: &EventDraft) -> Result<Event, Error> {
        let changes = self.validate(draft)?;
        let session = self.active_session()?;
        if !self.state().contains(id) {
            return Err(Error::UnknownEvent(id));
        }
        let _submission = self.begin(Submission::Existing(id))?;

        match self.store.update(&session, id, changes).await {
            Ok(event) => {
                let mut state = self.state();
                if let Some(slot) = state.events.iter_mut().find(|e| e.id == id) {
                    *slot = event.clone();
                }
                state.sort();
                drop(state);
                self.notifier
                    .success("Success", "Event updated successfully!");
                Ok(event)
            }
            Err(err) => {
                self.notifier
                    .failure("Error updating event", err.to_string());
                Err(err)
            }
        }
    }

    /// Delete an event
    pub async fn remove(&self, id: EventId) -> Result<(), Error> {
        let session = self.active_session()?;
        if !self.state().contains(id) {
            return Err(Error::UnknownEvent(id));
        }
        let _submission = self.begin(Submission::Existing(id))?;

        match self.store.delete(&session, id).await {
            Ok(()) => {
                self.state().events.retain(|event| event.id != id);
                self.notifier
                    .success("Success", "Event deleted successfully.");
                Ok(())
            }
            Err(err) => {
                self.notifier
                    .failure("Error deleting event", err.to_string());
                Err(err)
            }
        }
    }

    fn validate(&self, draft: &EventDraft) -> Result<EventChanges, Error> {
        draft.validate().map_err(|err| {
            self.notifier.failure("Validation Error", err.to_string());
            err
        })
    }

    /// Events whose name, description or location contain `term`, ignoring case
    pub fn search(&self, term: &str) -> Vec<Event> {
        let needle = term.to_lowercase();
        self.state()
            .events
            .iter()
            .filter(|event| needle.is_empty() || event.matches(&needle))
            .cloned()
            .collect()
    }

    /// The whole collection, ascending by date
    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn get(&self, id: EventId) -> Option<Event> {
        self.state().events.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Whether any mutation is outstanding; front ends disable every mutating action meanwhile
    pub fn is_submitting(&self) -> bool {
        self.state().in_flight.is_submitting()
    }

    /// The existing event currently being written, if any
    pub fn submitting_event_id(&self) -> Option<EventId> {
        self.state().in_flight.event_id()
    }

    pub fn is_busy(&self, id: EventId) -> bool {
        self.state().in_flight.is_busy(id)
    }

    /// Forget the local collection without touching the backend
    pub fn clear(&self) {
        self.state().events.clear();
    }
}
