//! Storefront route table.
//!
//! The reconciler decides where to navigate by comparing paths against this
//! table. Defaults match the storefront's Polish URL scheme.

use serde::{Deserialize, Serialize};

/// Paths the session reconciler needs to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    /// Home view, target of logout and session-expiry navigation.
    pub home: String,
    /// Where a freshly authenticated user lands.
    pub landing: String,
    /// Login form view.
    pub login_view: String,
    /// Registration form view.
    pub register_view: String,
    /// Login form submission endpoint.
    pub login_endpoint: String,
    /// Registration form submission endpoint.
    pub register_endpoint: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            landing: "/moje-konto".to_string(),
            login_view: "/logowanie".to_string(),
            register_view: "/rejestracja".to_string(),
            login_endpoint: "/api/auth/login".to_string(),
            register_endpoint: "/api/auth/register".to_string(),
        }
    }
}

impl Routes {
    /// Returns `true` for the login and registration form views.
    #[must_use]
    pub fn is_auth_view(&self, path: &str) -> bool {
        let path = path_only(path);
        path == self.login_view || path == self.register_view
    }

    /// Returns `true` if `path` is the login submission endpoint.
    #[must_use]
    pub fn is_login_endpoint(&self, path: &str) -> bool {
        path_only(path) == self.login_endpoint
    }

    /// Returns `true` for either credential submission endpoint.
    #[must_use]
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path_only(path);
        path == self.login_endpoint || path == self.register_endpoint
    }
}

/// Strip any query string or fragment from a request path.
#[must_use]
pub fn path_only(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
