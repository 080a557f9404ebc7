//! Session state and its transitions

use serde::Serialize;

use crate::auth::{AuthChangeEvent, Session, User};

/// Coarse position in the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// The persisted session has not been looked up yet
    Unresolved,
    Authenticated,
    Unauthenticated,
}

/// What an identity-gated view may do
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// Identity is not known yet; show a loading indicator
    Pending,
    /// Send the visitor to the login entry point
    Redirect(String),
    Granted(User),
}

/// Session state as seen by the rest of the application.
///
/// `user` is set exactly when `session` is. While `loading` is true the
/// identity must be treated as indeterminate.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
    pub resolved: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
            resolved: false,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn phase(&self) -> Phase {
        match (self.resolved, &self.user) {
            (false, _) => Phase::Unresolved,
            (true, Some(_)) => Phase::Authenticated,
            (true, None) => Phase::Unauthenticated,
        }
    }

    pub fn access(&self, login_path: &str) -> Access {
        if self.loading {
            return Access::Pending;
        }
        match &self.user {
            Some(user) => Access::Granted(user.clone()),
            None => Access::Redirect(login_path.to_string()),
        }
    }

    /// The user id, once identity is settled
    pub fn settled_user_id(&self) -> Option<&str> {
        if self.loading {
            return None;
        }
        self.user.as_ref().map(|user| user.id.as_str())
    }

    /// Record the outcome of the startup lookup. Returns whether anything changed.
    pub(crate) fn settle(&mut self, session: Option<&Session>) -> bool {
        let next = Self::confirmed(session);
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    /// Apply a change pushed by the auth backend. Returns whether anything changed.
    pub(crate) fn apply(&mut self, event: AuthChangeEvent, session: Option<&Session>) -> bool {
        let session = match event {
            AuthChangeEvent::SignedOut => None,
            AuthChangeEvent::SignedIn | AuthChangeEvent::TokenRefreshed => session,
        };
        self.settle(session)
    }

    pub(crate) fn begin_transition(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Drop the loading flag after a transition that changed nothing
    pub(crate) fn end_transition(&mut self) -> bool {
        if !self.loading || !self.resolved {
            return false;
        }
        self.loading = false;
        true
    }

    fn confirmed(session: Option<&Session>) -> Self {
        Self {
            user: session.map(|s| s.user.clone()),
            session: session.cloned(),
            loading: false,
            resolved: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(user_id: &str) -> Session {
        serde_json::from_value(json!({
            "access_token": format!("token-{}", user_id),
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": { "id": user_id, "email": format!("{}@example.com", user_id) }
        }))
        .unwrap()
    }

    #[test]
    fn starts_unresolved_and_pending() {
        let state = SessionState::default();
        assert_eq!(state.phase(), Phase::Unresolved);
        assert_eq!(state.access("/login"), Access::Pending);
        assert_eq!(state.settled_user_id(), None);
    }

    #[test]
    fn push_changes_move_between_phases() {
        let mut state = SessionState::default();
        assert!(state.settle(None));
        assert_eq!(state.phase(), Phase::Unauthenticated);
        assert_eq!(state.access("/login"), Access::Redirect("/login".into()));

        let u1 = session("u1");
        assert!(state.apply(AuthChangeEvent::SignedIn, Some(&u1)));
        assert_eq!(state.phase(), Phase::Authenticated);
        assert_eq!(state.settled_user_id(), Some("u1"));
        assert!(matches!(state.access("/login"), Access::Granted(user) if user.id == "u1"));

        // same session again is not a change
        assert!(!state.apply(AuthChangeEvent::TokenRefreshed, Some(&u1)));

        // signed out ignores any session passed along
        assert!(state.apply(AuthChangeEvent::SignedOut, Some(&u1)));
        assert!(state.user.is_none() && state.session.is_none());
    }

    #[test]
    fn transitions_toggle_loading() {
        let mut state = SessionState::default();
        // cannot finish a transition before the first resolution
        assert!(!state.end_transition());
        assert!(state.loading);

        state.settle(None);
        assert!(state.begin_transition());
        assert!(!state.begin_transition());
        assert_eq!(state.access("/login"), Access::Pending);
        assert!(state.end_transition());
        assert!(!state.loading);
    }
}
