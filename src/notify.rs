//! User-facing notifications emitted by the session manager and the event list

use log::{info, trace, warn};
use serde::Serialize;
use tokio::sync::broadcast;

/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Failure,
}

/// A toast-style message describing the outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn failure(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

/// Broadcast sink shared by every component that reports outcomes
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Receive every notification emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => info!("{}: {}", notification.title, notification.description),
            Severity::Failure => warn!("{}: {}", notification.title, notification.description),
        }
        // Ignore send error if no receivers are listening
        if self.sender.send(notification).is_err() {
            trace!("No notification listeners");
        }
    }

    pub fn success(&self, title: &str, description: impl Into<String>) {
        self.notify(Notification::success(title, description));
    }

    pub fn failure(&self, title: &str, description: impl Into<String>) {
        self.notify(Notification::failure(title, description));
    }
}
