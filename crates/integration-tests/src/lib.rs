//! Integration tests for the Secondhand session reconciler.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p secondhand-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_expiry` - Stored token validation and 401 handling
//! - `login_flow` - Login/registration, including server-emitted triggers
//! - `requests` - Header decoration and the loading indicator
//! - `scroll_restoration` - Scroll memory across reloads
//!
//! Every scenario runs against [`MemoryStorage`] and a [`RecordingHost`]
//! under a paused tokio clock, so timers resolve instantly and in order.

use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secondhand_core::HX_TRIGGER;
use secondhand_session::{
    ClientEvent, HostError, MemoryStorage, NavigationIntent, Reconciler, ReconcilerConfig,
    ResponseInfo, Runtime,
};
use url::Url;

pub use secondhand_session::Host;

/// Origin of every test page.
pub const ORIGIN: &str = "https://sklep.example";

/// Absolute URL of `path` on the test origin.
///
/// # Panics
///
/// Panics if `path` cannot be joined onto the origin.
#[must_use]
#[allow(clippy::expect_used)]
pub fn page(path: &str) -> Url {
    Url::parse(ORIGIN)
        .and_then(|origin| origin.join(path))
        .expect("test path joins onto origin")
}

/// An unsigned JWT carrying `claims`.
#[must_use]
pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// An unsigned JWT expiring at `exp` (seconds since epoch).
#[must_use]
pub fn jwt_expiring_at(exp: i64) -> String {
    unsigned_jwt(&serde_json::json!({ "exp": exp, "sub": "42", "role": "customer" }))
}

/// A host call observed by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Navigate(NavigationIntent),
    Dispatch(ClientEvent),
    ScrollTo(f64),
    ScrollToTop,
    Indicator(bool),
    ClearFormErrors(Vec<String>),
}

/// Host that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<Recorded>,
}

impl RecordingHost {
    /// Navigations issued so far.
    #[must_use]
    pub fn navigations(&self) -> Vec<&NavigationIntent> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Recorded::Navigate(intent) => Some(intent),
                _ => None,
            })
            .collect()
    }

    /// Custom events dispatched so far.
    #[must_use]
    pub fn dispatched(&self) -> Vec<&ClientEvent> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Recorded::Dispatch(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    /// Scroll offsets applied so far.
    #[must_use]
    pub fn scrolls(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Recorded::ScrollTo(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// Last indicator state set, if any.
    #[must_use]
    pub fn indicator(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            Recorded::Indicator(visible) => Some(*visible),
            _ => None,
        })
    }
}

impl Host for RecordingHost {
    async fn navigate(&mut self, intent: &NavigationIntent) -> Result<Url, HostError> {
        self.calls.push(Recorded::Navigate(intent.clone()));
        Url::parse(ORIGIN)
            .and_then(|origin| origin.join(&intent.path))
            .map_err(|e| HostError::Navigation(e.to_string()))
    }

    async fn dispatch(&mut self, event: &ClientEvent) -> Result<(), HostError> {
        self.calls.push(Recorded::Dispatch(event.clone()));
        Ok(())
    }

    async fn scroll_to(&mut self, position: f64) -> Result<(), HostError> {
        self.calls.push(Recorded::ScrollTo(position));
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), HostError> {
        self.calls.push(Recorded::ScrollToTop);
        Ok(())
    }

    async fn set_indicator(&mut self, visible: bool) -> Result<(), HostError> {
        self.calls.push(Recorded::Indicator(visible));
        Ok(())
    }

    async fn clear_form_errors(&mut self, containers: &[String]) -> Result<(), HostError> {
        self.calls.push(Recorded::ClearFormErrors(containers.to_vec()));
        Ok(())
    }
}

/// A runtime over `storage` with the default configuration.
#[must_use]
pub fn runtime(storage: MemoryStorage) -> Runtime<MemoryStorage, RecordingHost> {
    Runtime::new(
        Reconciler::new(storage, ReconcilerConfig::default()),
        RecordingHost::default(),
    )
}

/// What the page sees of a server response to a request for `path`.
///
/// # Errors
///
/// Returns the body read error.
pub async fn observe(path: &str, response: Response) -> Result<ResponseInfo, axum::Error> {
    let (parts, body) = response.into_parts();
    let trigger = parts
        .headers
        .get(HX_TRIGGER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = axum::body::to_bytes(body, usize::MAX).await?;
    let body = (!bytes.is_empty()).then(|| String::from_utf8_lossy(&bytes).into_owned());
    Ok(ResponseInfo {
        path: path.to_string(),
        status: parts.status.as_u16(),
        trigger,
        body,
    })
}
