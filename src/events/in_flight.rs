//! Tracking of outstanding event mutations

use super::EventId;
use crate::error::Error;

/// What a pending mutation is writing to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Submission {
    /// A draft that has no id yet
    New,
    /// An event already in the collection
    Existing(EventId),
}

/// Outstanding mutations, tracked per event.
///
/// Only one mutation may be outstanding at a time; the per-event record lets
/// callers tell which row is busy.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    active: Vec<Submission>,
}

impl InFlight {
    pub(crate) fn begin(&mut self, submission: Submission) -> Result<(), Error> {
        if !self.active.is_empty() {
            return Err(Error::Busy);
        }
        self.active.push(submission);
        Ok(())
    }

    pub(crate) fn finish(&mut self, submission: Submission) {
        self.active.retain(|s| *s != submission);
    }

    pub(crate) fn is_submitting(&self) -> bool {
        !self.active.is_empty()
    }

    pub(crate) fn is_busy(&self, id: EventId) -> bool {
        self.active.contains(&Submission::Existing(id))
    }

    pub(crate) fn event_id(&self) -> Option<EventId> {
        self.active.iter().find_map(|s| match s {
            Submission::Existing(id) => Some(*id),
            Submission::New => None,
        })
    }
}
