//! Login redirect after an unrecoverable session
//!
//! A browser host reports the page the user is on; the client saves it as the
//! return path and forces navigation to the login route. Hosts with no page
//! (CLI, background jobs) use `HeadlessNavigator`, which never redirects.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

/// Navigation and session-storage hooks of the host.
pub trait Navigator: Send + Sync {
    /// Path the user is currently on, or `None` outside a browser context.
    fn current_path(&self) -> Option<String>;

    /// Remember where to send the user after they log in again.
    fn save_return_path(&self, path: &str);

    /// Take (and forget) the remembered return path.
    fn take_return_path(&self) -> Option<String>;

    fn navigate(&self, route: &str);
}

/// Send the user to `login_route`, remembering the page they were on.
///
/// Returns false without side effects when there is no browser context.
pub fn redirect_to_login(navigator: &dyn Navigator, login_route: &str) -> bool {
    let Some(path) = navigator.current_path() else {
        debug!("no browser context, skipping login redirect");
        return false;
    };
    // A second failure while already on the login page keeps the original
    // return path.
    if path != login_route {
        navigator.save_return_path(&path);
    }
    info!(return_to = %path, login_route, "session expired, redirecting to login");
    navigator.navigate(login_route);
    true
}

/// Navigator for hosts without pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessNavigator;

impl Navigator for HeadlessNavigator {
    fn current_path(&self) -> Option<String> {
        None
    }

    fn save_return_path(&self, _path: &str) {}

    fn take_return_path(&self) -> Option<String> {
        None
    }

    fn navigate(&self, _route: &str) {}
}

#[derive(Debug, Default)]
struct NavigationState {
    current: Option<String>,
    return_path: Option<String>,
    history: Vec<String>,
}

/// In-memory browser session: current location, session-storage return path
/// and the list of forced navigations.
#[derive(Debug, Default)]
pub struct SessionNavigator {
    state: Mutex<NavigationState>,
}

impl SessionNavigator {
    /// Navigator positioned at `path`.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavigationState {
                current: Some(path.into()),
                ..NavigationState::default()
            }),
        }
    }

    pub fn set_current_path(&self, path: impl Into<String>) {
        self.lock().current = Some(path.into());
    }

    /// Return path currently saved, without taking it.
    pub fn saved_return_path(&self) -> Option<String> {
        self.lock().return_path.clone()
    }

    /// Routes navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NavigationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for SessionNavigator {
    fn current_path(&self) -> Option<String> {
        self.lock().current.clone()
    }

    fn save_return_path(&self, path: &str) {
        self.lock().return_path = Some(path.to_string());
    }

    fn take_return_path(&self) -> Option<String> {
        self.lock().return_path.take()
    }

    fn navigate(&self, route: &str) {
        let mut state = self.lock();
        state.current = Some(route.to_string());
        state.history.push(route.to_string());
    }
}
