//! Persistence seam for event rows

use async_trait::async_trait;
use log::debug;

use super::{Event, EventChanges, EventId, NewEvent};
use crate::auth::Session;
use crate::error::Error;
use crate::postgrest::{PostgrestClient, SortOrder};

/// Row operations the event list relies on.
///
/// Every call runs as the user owning `session`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events owned by the session user, ascending by date
    async fn list(&self, session: &Session) -> Result<Vec<Event>, Error>;

    async fn insert(&self, session: &Session, event: NewEvent) -> Result<Event, Error>;

    async fn update(
        &self,
        session: &Session,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Event, Error>;

    async fn delete(&self, session: &Session, id: EventId) -> Result<(), Error>;
}

/// Event table served over PostgREST
#[derive(Debug, Clone)]
pub struct PostgrestEventStore {
    table: PostgrestClient,
}

impl PostgrestEventStore {
    pub fn new(table: PostgrestClient) -> Self {
        Self { table }
    }
}

#[async_trait]
impl EventStore for PostgrestEventStore {
    async fn list(&self, session: &Session) -> Result<Vec<Event>, Error> {
        let events = self
            .table
            .select("*")
            .auth(&session.access_token)
            .eq("user_id", &session.user.id)
            .order("date", SortOrder::Ascending)
            .execute::<Event>()
            .await?;

        debug!("Fetched {} events from {}", events.len(), self.table.table());
        Ok(events)
    }

    async fn insert(&self, session: &Session, event: NewEvent) -> Result<Event, Error> {
        self.table
            .insert(event)
            .auth(&session.access_token)
            .single()
            .execute::<Event>()
            .await
    }

    async fn update(
        &self,
        session: &Session,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Event, Error> {
        self.table
            .update(changes)
            .auth(&session.access_token)
            .eq("id", id)
            .eq("user_id", &session.user.id)
            .single()
            .execute::<Event>()
            .await
    }

    async fn delete(&self, session: &Session, id: EventId) -> Result<(), Error> {
        self.table
            .delete()
            .auth(&session.access_token)
            .eq("id", id)
            .eq("user_id", &session.user.id)
            .execute_no_return()
            .await
    }
}
