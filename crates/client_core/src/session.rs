//! Authenticated session and the navigation guard built on it.

use tracing::{info, warn};

use crate::{api::ApiClient, error::AuthError};

pub const LOGIN_REQUIRED_WARNING: &str = "You need to sign in first.";

/// Holds at most one bearer token. Created empty, populated by a successful
/// login, and kept until the process exits.
#[derive(Debug, Default, Clone)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Token for protected calls. This is the only accessor, so nothing can
    /// reach a protected endpoint without a prior successful login.
    pub fn bearer(&self) -> Result<&str, AuthError> {
        self.token.as_deref().ok_or(AuthError::NotAuthenticated)
    }

    /// On failure the session is left exactly as it was.
    pub async fn login(
        &mut self,
        api: &dyn ApiClient,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        match api.login(username, password).await {
            Ok(token) => {
                self.token = Some(token);
                info!(username, "session authenticated");
                Ok(())
            }
            Err(err) => {
                warn!(username, error = %err, "login failed");
                Err(err)
            }
        }
    }

    pub fn navigate(&self, requested: View) -> Navigation {
        guard_navigation(self.is_authenticated(), requested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Capture,
    Identification,
    Configuration,
}

impl View {
    pub const ALL: [View; 4] = [
        View::Login,
        View::Capture,
        View::Identification,
        View::Configuration,
    ];

    pub fn title(self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Capture => "Capture",
            View::Identification => "Identification",
            View::Configuration => "Configuration",
        }
    }

    pub fn is_protected(self) -> bool {
        self != View::Login
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allowed(View),
    Redirected { to: View, warning: &'static str },
}

impl Navigation {
    pub fn view(&self) -> View {
        match self {
            Navigation::Allowed(view) => *view,
            Navigation::Redirected { to, .. } => *to,
        }
    }
}

/// Enforced at the point of navigation: protected views stay listed but an
/// unauthenticated attempt to enter one lands back on the login view.
pub fn guard_navigation(authenticated: bool, requested: View) -> Navigation {
    if requested.is_protected() && !authenticated {
        Navigation::Redirected {
            to: View::Login,
            warning: LOGIN_REQUIRED_WARNING,
        }
    } else {
        Navigation::Allowed(requested)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
