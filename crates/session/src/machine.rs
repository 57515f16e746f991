//! Authentication phase state machine.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the client believes the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// No token stored.
    #[default]
    Anonymous,
    /// Login request in flight.
    Authenticating,
    /// A token is stored and believed valid.
    Authenticated,
    /// The session ended and the client is moving to the home view.
    SessionExpiring,
}

/// Labelled edges of [`AuthPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Credentials were posted to the login endpoint.
    LoginSubmitted,
    /// The login endpoint answered 401.
    LoginRejected,
    /// The login endpoint answered 401 while an earlier token is still stored.
    LoginRejectedWithSession,
    /// A token was received and stored.
    TokenAccepted,
    /// The server rejected the token or it expired.
    SessionLost,
    /// The user logged out.
    LoggedOut,
    /// The post-session navigation finished or was skipped.
    NavigationSettled,
}

impl AuthPhase {
    /// Phase to start in given whether a token is stored.
    #[must_use]
    pub const fn initial(has_token: bool) -> Self {
        if has_token {
            Self::Authenticated
        } else {
            Self::Anonymous
        }
    }

    /// The phase reached by `transition`, or `None` if it does not apply.
    #[must_use]
    pub fn next(self, transition: Transition) -> Option<Self> {
        use AuthPhase::{Anonymous, Authenticated, Authenticating, SessionExpiring};
        use Transition::{
            LoggedOut, LoginRejected, LoginRejectedWithSession, LoginSubmitted, NavigationSettled,
            SessionLost, TokenAccepted,
        };

        let next = match (self, transition) {
            (Anonymous | Authenticating, LoginSubmitted) => Authenticating,
            (Authenticating, LoginRejected) => Anonymous,
            (Authenticating, LoginRejectedWithSession) | (_, TokenAccepted) => Authenticated,
            (Authenticated | Authenticating, LoggedOut) => SessionExpiring,
            (Anonymous | Authenticated | Authenticating, SessionLost) => SessionExpiring,
            (SessionExpiring, NavigationSettled) => Anonymous,
            _ => {
                debug!(phase = ?self, ?transition, "Transition does not apply");
                return None;
            }
        };
        Some(next)
    }

    /// Whether a token is expected to be stored in this phase.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}
