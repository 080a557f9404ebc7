//! Event records and the drafts they are created from

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Message shown when a draft lacks its required fields
pub const REQUIRED_FIELDS_MESSAGE: &str = "Event name and date are required.";

/// Backend-assigned event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        EventId(id)
    }
}

/// A stored event row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    /// Owner; set at creation and never changed
    pub user_id: String,

    pub name: String,

    pub date: NaiveDate,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Case-insensitive substring match over name, description and location.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(needle);

        contains(&self.name)
            || self.description.as_deref().map_or(false, contains)
            || self.location.as_deref().map_or(false, contains)
    }

    /// Form state pre-filled from this event, for editing
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            name: self.name.clone(),
            date: Some(self.date),
            location: self.location.clone(),
            description: self.description.clone(),
        }
    }
}

/// Unsaved form state for an event being created or edited
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDraft {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            date,
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check required fields and normalise the rest into a write payload
    pub fn validate(&self) -> Result<EventChanges, Error> {
        let name = self.name.trim();
        let date = match self.date {
            Some(date) if !name.is_empty() => date,
            _ => return Err(Error::validation(REQUIRED_FIELDS_MESSAGE)),
        };

        Ok(EventChanges {
            name: name.to_string(),
            date,
            location: non_blank(&self.location),
            description: non_blank(&self.description),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validated, writable event fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventChanges {
    pub name: String,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Insert payload: the validated fields bound to their owner
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    #[serde(flatten)]
    pub changes: EventChanges,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> Option<NaiveDate> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn validation_requires_name_and_date() {
        for draft in [
            EventDraft::new("", date("2024-07-01")),
            EventDraft::new("   ", date("2024-07-01")),
            EventDraft::new("Party", None),
        ] {
            match draft.validate() {
                Err(Error::Validation(msg)) => assert_eq!(msg, REQUIRED_FIELDS_MESSAGE),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn validation_normalises_optional_fields() {
        let changes = EventDraft::new("  Party ", date("2024-07-01"))
            .with_location("  ")
            .with_description("Bring snacks")
            .validate()
            .unwrap();

        assert_eq!(changes.name, "Party");
        assert_eq!(changes.location, None);
        assert_eq!(changes.description.as_deref(), Some("Bring snacks"));
    }

    #[test]
    fn insert_payload_shape() {
        let changes = EventDraft::new("Party", date("2024-07-01"))
            .validate()
            .unwrap();
        let payload = serde_json::to_value(NewEvent {
            changes,
            user_id: "user-1".to_string(),
        })
        .unwrap();

        assert_eq!(
            payload,
            json!({
                "name": "Party",
                "date": "2024-07-01",
                "location": null,
                "description": null,
                "user_id": "user-1"
            })
        );
    }

    #[test]
    fn row_decoding_and_search() {
        let event: Event = serde_json::from_value(json!({
            "id": 7,
            "user_id": "user-1",
            "name": "Product Launch",
            "date": "2024-05-01",
            "location": "Oslo",
            "description": null,
            "created_at": "2024-01-02T03:04:05.678+00:00"
        }))
        .unwrap();

        assert_eq!(event.id, EventId(7));
        assert!(event.created_at.is_some());
        assert!(event.matches("launch"));
        assert!(event.matches("oslo"));
        assert!(!event.matches("wedding"));
        assert_eq!(event.to_draft().date, date("2024-05-01"));
    }
}
