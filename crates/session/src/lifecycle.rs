//! Session token lifecycle.
//!
//! Stores tokens handed out by the server, tears the session down when the
//! server or the token itself says it is over, and announces both to the page.

use chrono::{DateTime, Utc};
use secondhand_core::{AuthSource, Notification, SessionToken};
use tracing::{debug, error, info, warn};

use crate::event::{Effect, NavigationIntent};
use crate::machine::{AuthPhase, Transition};
use crate::navigation::Gate;
use crate::reconciler::Reconciler;
use crate::store::KeyValueStorage;

/// HTTP status treated as an authentication failure.
pub const UNAUTHORIZED: u16 = 401;

/// User-facing notification texts.
pub mod messages {
    pub const LOGIN_SUCCESS: &str = "Zalogowano pomyślnie.";
    pub const LOGIN_MISSING_TOKEN: &str =
        "Logowanie nie powiodło się: serwer nie przekazał tokenu sesji.";
    pub const SESSION_EXPIRED: &str = "Twoja sesja wygasła. Zaloguj się ponownie.";
    pub const SESSION_INVALID: &str = "Sesja wygasła lub jest nieprawidłowa. Nastąpiło wylogowanie.";
    pub const LOGGED_OUT: &str = "Wylogowano pomyślnie.";
    pub const REGISTRATION_COMPLETE: &str = "Rejestracja zakończona. Możesz się teraz zalogować.";
    pub const ORDER_PLACED: &str = "Dziękujemy! Zamówienie zostało złożone.";
}

impl<S: KeyValueStorage> Reconciler<S> {
    /// Store a freshly issued token and move to the landing view once the
    /// success notification has been seen.
    pub(crate) fn on_login_succeeded(
        &mut self,
        token: Option<SessionToken>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(token) = token else {
            error!("Login succeeded without a token");
            self.notify(Notification::error(messages::LOGIN_MISSING_TOKEN), effects);
            return;
        };

        self.accept_token(&token, effects);
        let id = self.notify_held(Notification::success(messages::LOGIN_SUCCESS), effects);
        let landing = NavigationIntent::replace(self.config.routes.landing.clone());
        self.park_navigation(landing, Gate::Notification(id), effects);
    }

    /// A registration was accepted. With a token this is a login; without
    /// one the user is sent to the login form.
    pub(crate) fn on_registration_completed(
        &mut self,
        token: Option<SessionToken>,
        message: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if token.is_some() {
            self.on_login_succeeded(token, effects);
            return;
        }

        info!("Registration completed without a session");
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| messages::REGISTRATION_COMPLETE.to_string());
        let id = self.notify_held(Notification::success(message), effects);
        let login = NavigationIntent::replace(self.config.routes.login_view.clone());
        self.park_navigation(login, Gate::Notification(id), effects);
    }

    /// Handle a failed response.
    ///
    /// Only 401 matters. On the login endpoint it is a credential rejection
    /// that the inline form reports; anywhere else the session has expired,
    /// even when no token was stored.
    pub(crate) fn on_auth_failure(&mut self, status: u16, path: &str, effects: &mut Vec<Effect>) {
        if status != UNAUTHORIZED {
            return;
        }
        if self.config.routes.is_login_endpoint(path) {
            debug!(path, "Credentials rejected");
            let transition = if self.store.token().is_some() {
                Transition::LoginRejectedWithSession
            } else {
                Transition::LoginRejected
            };
            self.transition(transition);
            return;
        }
        if self.phase == AuthPhase::SessionExpiring {
            debug!(path, "Session already expiring");
            return;
        }

        if self.store.token_entry().is_some() {
            warn!(path, "Session rejected by server");
            self.store.clear_token();
        } else {
            warn!(path, "Unauthorized without a stored session");
        }
        self.transition(Transition::SessionLost);
        effects.push(Effect::auth_changed(false, Some(AuthSource::Unauthorized)));
        let id = self.notify_held(Notification::warning(messages::SESSION_EXPIRED), effects);
        let home = NavigationIntent::replace(self.config.routes.home.clone());
        self.park_navigation(home, Gate::Notification(id), effects);
    }

    /// Force a logout if the stored token is corrupt or expired.
    ///
    /// Returns `true` if a logout was forced.
    pub(crate) fn check_stored_session_validity(
        &mut self,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> bool {
        let Some(entry) = self.store.token_entry() else {
            return false;
        };

        let verdict = entry
            .and_then(|token| token.claims())
            .map(|claims| claims.is_expired_at(now));
        match verdict {
            Ok(false) => false,
            Ok(true) => {
                info!("Stored session expired");
                self.force_logout(effects);
                true
            }
            Err(e) => {
                warn!(error = %e, "Stored session token is unreadable");
                self.force_logout(effects);
                true
            }
        }
    }

    /// Drop the session and reload the home view.
    pub(crate) fn force_logout(&mut self, effects: &mut Vec<Effect>) {
        self.store.clear_token();
        self.transition(Transition::SessionLost);
        self.notify(Notification::info(messages::SESSION_INVALID), effects);
        let home = NavigationIntent::full(self.config.routes.home.clone());
        self.navigate(home, effects);
    }

    /// The user asked to log out.
    pub(crate) fn on_logout_requested(&mut self, effects: &mut Vec<Effect>) {
        info!("Logging out");
        self.store.clear_token();
        self.transition(Transition::LoggedOut);
        effects.push(Effect::auth_changed(false, Some(AuthSource::Logout)));
        let id = self.notify_held(Notification::info(messages::LOGGED_OUT), effects);
        let home = NavigationIntent::replace(self.config.routes.home.clone());
        self.park_navigation(home, Gate::Notification(id), effects);
    }

    fn accept_token(&mut self, token: &SessionToken, effects: &mut Vec<Effect>) {
        self.store.set_token(token);
        self.transition(Transition::TokenAccepted);
        effects.push(Effect::auth_changed(true, Some(AuthSource::Login)));
    }
}
