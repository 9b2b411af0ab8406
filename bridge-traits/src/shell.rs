//! Application Shell Abstraction
//!
//! The session core must be able to push the user to the login screen and
//! raise a user-visible notice when a session expires during active use.
//! Both are host capabilities (router, native alert dialog), so they live
//! behind a bridge trait where tests can observe them.

/// Routes the session core may navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The login entry point. Target of every forced sign-out.
    Login,
    /// The authenticated home screen.
    Home,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/home",
        }
    }
}

/// Application lifecycle state
///
/// Reported by the host when the app moves between foreground and background.
/// The session core re-checks token expiry on the background-to-active edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// App is in the foreground and interactive
    Active,
    /// App is visible but not interactive (e.g. during a system prompt)
    Inactive,
    /// App is in the background
    Background,
}

impl LifecycleState {
    /// Whether a transition from `self` to `next` is a return to the
    /// foreground.
    pub fn resumed_to(&self, next: LifecycleState) -> bool {
        matches!(self, LifecycleState::Background | LifecycleState::Inactive)
            && next == LifecycleState::Active
    }
}

/// Host navigation and alert surface
///
/// Methods are fire-and-forget from the core's perspective; the host owns
/// routing and presentation. Implementations must be safe to call from any
/// async task.
pub trait AppShell: Send + Sync {
    /// Replace the current route. Used to force the login screen after a
    /// session teardown.
    fn navigate(&self, route: Route);

    /// Present a user-visible alert. Used only for interactive session-expiry
    /// notices; startup failures stay silent.
    fn alert(&self, title: &str, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.as_str(), "/login");
        assert_eq!(Route::Home.as_str(), "/home");
    }

    #[test]
    fn test_lifecycle_resume_edge() {
        assert!(LifecycleState::Background.resumed_to(LifecycleState::Active));
        assert!(LifecycleState::Inactive.resumed_to(LifecycleState::Active));
        assert!(!LifecycleState::Active.resumed_to(LifecycleState::Active));
        assert!(!LifecycleState::Background.resumed_to(LifecycleState::Background));
    }
}
