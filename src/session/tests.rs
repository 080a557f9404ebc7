use super::*;
use crate::notify::{Notification, Severity};
use crate::testing::{session, FakeAuth};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

#[tokio::test]
async fn resolve_restores_stored_session_once() {
    let auth = FakeAuth::with_stored(session("u1"));
    let manager = SessionManager::start(auth.clone(), Notifier::new());
    assert_eq!(manager.guard(), Access::Pending);

    manager.resolve().await;
    manager.resolve().await;

    assert_eq!(auth.get_session_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state().phase(), Phase::Authenticated);
    assert_eq!(manager.user().unwrap().id, "u1");
    assert!(matches!(manager.guard(), Access::Granted(user) if user.id == "u1"));
}

#[tokio::test]
async fn resolve_without_session_redirects() {
    let auth = FakeAuth::new();
    let manager = SessionManager::start(auth, Notifier::new()).with_login_path("/signin");

    manager.resolve().await;

    assert!(!manager.is_loading());
    assert!(!manager.is_authenticated());
    assert_eq!(manager.guard(), Access::Redirect("/signin".to_string()));
}

#[tokio::test]
async fn resolve_error_counts_as_signed_out() {
    let auth = FakeAuth::with_stored(session("u1"));
    auth.fail_next("Invalid Refresh Token");
    let manager = SessionManager::start(auth, Notifier::new());

    manager.resolve().await;

    assert_eq!(manager.state().phase(), Phase::Unauthenticated);
}

#[tokio::test]
async fn push_during_resolve_is_not_overwritten() {
    let gate = Arc::new(Notify::new());
    let auth = FakeAuth::gated(session("u1"), gate.clone());
    let manager = SessionManager::start(auth.clone(), Notifier::new());

    // the lookup has already read u1 when the sign-in for u2 arrives
    tokio::join!(manager.resolve(), async {
        auth.push(AuthChangeEvent::SignedIn, Some(session("u2")));
        gate.notify_one();
    });

    assert_eq!(auth.get_session_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state().phase(), Phase::Authenticated);
    assert_eq!(manager.user().unwrap().id, "u2");
    assert_eq!(manager.session().unwrap().access_token, "token-u2");
}

#[tokio::test]
async fn login_populates_state_from_push() {
    let auth = FakeAuth::new();
    let notifier = Notifier::new();
    let mut notifications = notifier.subscribe();
    let manager = SessionManager::start(auth, notifier);
    manager.resolve().await;
    let mut watcher = manager.watch();

    assert!(manager.login("u1@example.com", "secret").await);

    assert!(watcher.has_changed().unwrap());
    let state = watcher.borrow_and_update().clone();
    assert_eq!(state.user.unwrap().id, "u1");
    assert!(!state.loading);
    assert_eq!(manager.session().unwrap().access_token, "token-u1");
    assert_eq!(
        drain(&mut notifications),
        [Notification::success("Login Successful", "Welcome back!")]
    );
}

#[tokio::test]
async fn login_failure_reports_backend_message() {
    let auth = FakeAuth::new();
    let notifier = Notifier::new();
    let mut notifications = notifier.subscribe();
    let manager = SessionManager::start(auth.clone(), notifier);
    manager.resolve().await;

    auth.fail_next("Invalid login credentials");
    assert!(!manager.login("u1@example.com", "wrong").await);

    assert!(!manager.is_loading());
    assert!(manager.user().is_none());
    assert_eq!(
        drain(&mut notifications),
        [Notification::failure("Login Failed", "Invalid login credentials")]
    );

    // blank credentials never reach the backend
    assert!(!manager.login("  ", "secret").await);
    assert_eq!(drain(&mut notifications)[0].severity, Severity::Failure);
}

#[tokio::test]
async fn signup_pending_confirmation_stays_signed_out() {
    let auth = Arc::new(FakeAuth {
        confirm_email: true,
        ..Default::default()
    });
    let notifier = Notifier::new();
    let mut notifications = notifier.subscribe();
    let manager = SessionManager::start(auth, notifier);
    manager.resolve().await;

    assert!(manager.signup("new@example.com", "secret").await);

    assert!(!manager.is_loading());
    assert!(!manager.is_authenticated());
    assert_eq!(
        drain(&mut notifications),
        [Notification::success(
            "Signup Successful",
            "Please check your email to verify your account."
        )]
    );
}

#[tokio::test]
async fn logout_clears_state_only_on_success() {
    let auth = FakeAuth::with_stored(session("u1"));
    let notifier = Notifier::new();
    let mut notifications = notifier.subscribe();
    let manager = SessionManager::start(auth.clone(), notifier);
    manager.resolve().await;

    auth.fail_next("network down");
    assert!(!manager.logout().await);
    assert_eq!(manager.user().unwrap().id, "u1");
    assert!(!manager.is_loading());
    assert_eq!(drain(&mut notifications)[0].title, "Logout Failed");

    assert!(manager.logout().await);
    assert!(manager.user().is_none());
    assert!(manager.session().is_none());
    assert_eq!(
        drain(&mut notifications),
        [Notification::success(
            "Logged Out",
            "You have been successfully logged out."
        )]
    );
}

#[tokio::test]
async fn external_sign_out_is_observed() {
    let auth = FakeAuth::with_stored(session("u1"));
    let manager = SessionManager::start(auth.clone(), Notifier::new());
    manager.resolve().await;

    auth.push(AuthChangeEvent::SignedOut, None);

    assert_eq!(manager.guard(), Access::Redirect("/login".to_string()));
}

#[tokio::test]
async fn shutdown_releases_subscription_once() {
    let auth = FakeAuth::new();
    let manager = SessionManager::start(auth.clone(), Notifier::new());
    assert_eq!(auth.listeners.len(), 1);

    manager.shutdown();
    manager.shutdown();
    assert!(auth.listeners.is_empty());

    // pushes after shutdown no longer reach the manager
    auth.push(AuthChangeEvent::SignedIn, Some(session("u1")));
    assert!(manager.user().is_none());

    let second = SessionManager::start(auth.clone(), Notifier::new());
    assert_eq!(auth.listeners.len(), 1);
    drop(second);
    assert!(auth.listeners.is_empty());
}
