//! Where the user currently is, and how to send them back to login.
//!
//! The request gateway needs two things from the surrounding application:
//! whether it is already on an auth view (in which case a 401 must not
//! trigger a refresh), and a way to send the user to login once a refresh
//! has failed.

use std::sync::Mutex;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect_to_login(&self);

    /// True while on the login or registration view.
    fn on_auth_view(&self) -> bool {
        let path = self.current_path();
        path == LOGIN_PATH || path == REGISTER_PATH
    }
}

/// Navigator for the terminal: the "view" is the command being run, and a
/// redirect is a one-time notice telling the user to log in again.
pub struct SessionNavigator {
    path: Mutex<String>,
}

impl SessionNavigator {
    pub fn new(path: &str) -> Self {
        Self {
            path: Mutex::new(path.to_string()),
        }
    }

    pub fn navigate(&self, path: &str) {
        let mut guard = self.path.lock().unwrap_or_else(|e| e.into_inner());
        *guard = path.to_string();
    }
}

impl Default for SessionNavigator {
    fn default() -> Self {
        Self::new("/boards")
    }
}

impl Navigator for SessionNavigator {
    fn current_path(&self) -> String {
        self.path.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn redirect_to_login(&self) {
        let mut guard = self.path.lock().unwrap_or_else(|e| e.into_inner());
        if *guard == LOGIN_PATH {
            return;
        }
        *guard = LOGIN_PATH.to_string();
        drop(guard);

        tracing::warn!("Token refresh failed. Redirecting to login.");
        eprintln!("Session expired. Run 'board-cli login'.");
    }
}

/// Records redirects instead of printing them.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNavigator {
    pub inner: SessionNavigator,
    pub redirects: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.inner.current_path()
    }

    fn redirect_to_login(&self) {
        if self.inner.current_path() != LOGIN_PATH {
            self.redirects
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
        self.inner.navigate(LOGIN_PATH);
    }
}
