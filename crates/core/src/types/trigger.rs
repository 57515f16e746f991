//! `HX-Trigger` wire format.
//!
//! The server pushes client-side custom events by attaching an `HX-Trigger`
//! response header. htmx accepts two shapes:
//!
//! ```text
//! HX-Trigger: clearCartDisplay, orderPlaced
//! HX-Trigger: {"updateCartCount": {"newCount": 2, ...}, "showMessage": {...}}
//! ```
//!
//! [`ServerEvent`] is the typed view of one entry. [`TriggerSet`] builds the
//! header on the server side; [`parse_trigger_header`] reads it on the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cart::CartSnapshot;
use super::notification::Notification;
use super::token::SessionToken;

/// Response header carrying server-pushed events.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Event names as they appear on the wire.
pub mod names {
    pub const LOGIN_SUCCESS: &str = "loginSuccess";
    pub const REGISTRATION_COMPLETE: &str = "registrationComplete";
    pub const AUTH_STATE_CHANGED: &str = "authStateChanged";
    pub const ORDER_PLACED: &str = "orderPlaced";
    pub const CLEAR_CART_DISPLAY: &str = "clearCartDisplay";
    pub const UPDATE_CART_COUNT: &str = "updateCartCount";
    pub const SHOW_MESSAGE: &str = "showMessage";
    pub const CART_STATE_UPDATED: &str = "cartStateUpdated";
}

/// Errors that can occur when reading or writing trigger payloads.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The header looked like JSON but did not parse as an object.
    #[error("trigger header is not a JSON object: {0}")]
    InvalidJson(String),
    /// An entry's detail did not have the expected shape.
    #[error("invalid detail for {event}: {reason}")]
    InvalidDetail {
        /// Event name.
        event: String,
        /// What was wrong.
        reason: String,
    },
    /// The event name is not one this client understands.
    #[error("unknown trigger event: {0}")]
    UnknownEvent(String),
    /// The serialised trigger set is not a valid header value.
    #[error("trigger set is not a valid header value: {0}")]
    InvalidHeaderValue(String),
}

/// Why the authentication state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthSource {
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "logout")]
    Logout,
    /// The server answered 401 to a request outside the login form.
    #[serde(rename = "401")]
    Unauthorized,
}

impl AuthSource {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Unauthorized => "401",
        }
    }

    /// Parse the wire representation. Unknown sources yield `None`.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "401" => Some(Self::Unauthorized),
            _ => None,
        }
    }
}

/// A custom event pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TriggerEntry", into = "TriggerEntry")]
pub enum ServerEvent {
    /// Login accepted; the token may be missing if the server misbehaves.
    LoginSucceeded { token: Option<SessionToken> },
    /// Registration accepted, optionally with an immediate session.
    RegistrationCompleted {
        token: Option<SessionToken>,
        message: Option<String>,
    },
    /// Generic authentication-state notification.
    AuthStateChanged {
        authenticated: bool,
        source: Option<AuthSource>,
    },
    /// An order was placed from the current cart.
    OrderPlaced { order_id: Option<String> },
    /// The cart display should be emptied.
    CartCleared,
    /// Cart contents changed.
    CartCountUpdated(CartSnapshot),
    /// Show a transient notification.
    ShowMessage(Notification),
}

impl ServerEvent {
    /// Wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoginSucceeded { .. } => names::LOGIN_SUCCESS,
            Self::RegistrationCompleted { .. } => names::REGISTRATION_COMPLETE,
            Self::AuthStateChanged { .. } => names::AUTH_STATE_CHANGED,
            Self::OrderPlaced { .. } => names::ORDER_PLACED,
            Self::CartCleared => names::CLEAR_CART_DISPLAY,
            Self::CartCountUpdated(_) => names::UPDATE_CART_COUNT,
            Self::ShowMessage(_) => names::SHOW_MESSAGE,
        }
    }

    /// Wire detail of this event.
    #[must_use]
    pub fn detail(&self) -> Value {
        match self {
            Self::LoginSucceeded { token } => {
                let mut detail = Map::new();
                if let Some(token) = token {
                    detail.insert("token".into(), Value::from(token.expose()));
                }
                Value::Object(detail)
            }
            Self::RegistrationCompleted { token, message } => {
                let mut detail = Map::new();
                if let Some(token) = token {
                    detail.insert("token".into(), Value::from(token.expose()));
                }
                if let Some(message) = message {
                    detail.insert("message".into(), Value::from(message.as_str()));
                }
                Value::Object(detail)
            }
            Self::AuthStateChanged {
                authenticated,
                source,
            } => {
                let mut detail = Map::new();
                detail.insert("authenticated".into(), Value::Bool(*authenticated));
                if let Some(source) = source {
                    detail.insert("source".into(), Value::from(source.as_str()));
                }
                Value::Object(detail)
            }
            Self::OrderPlaced { order_id } => match order_id {
                Some(id) => serde_json::json!({ "orderId": id }),
                None => Value::Object(Map::new()),
            },
            Self::CartCleared => Value::Null,
            Self::CartCountUpdated(snapshot) => serde_json::to_value(snapshot).unwrap_or_default(),
            Self::ShowMessage(notification) => {
                serde_json::to_value(notification).unwrap_or_default()
            }
        }
    }

    /// Build an event from its wire name and detail.
    ///
    /// Returns `Ok(None)` for names this client does not handle, so callers
    /// can let other listeners deal with them.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::InvalidDetail`] if a known event carries a
    /// detail of the wrong shape.
    pub fn from_parts(name: &str, detail: &Value) -> Result<Option<Self>, TriggerError> {
        let invalid = |reason: &str| TriggerError::InvalidDetail {
            event: name.to_string(),
            reason: reason.to_string(),
        };

        let event = match name {
            names::LOGIN_SUCCESS => Self::LoginSucceeded {
                token: token_in(detail),
            },
            names::REGISTRATION_COMPLETE => Self::RegistrationCompleted {
                token: token_in(detail),
                message: detail
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            names::AUTH_STATE_CHANGED => {
                let authenticated = detail
                    .get("authenticated")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| invalid("missing boolean `authenticated`"))?;
                let source = detail
                    .get("source")
                    .and_then(Value::as_str)
                    .and_then(AuthSource::from_wire);
                Self::AuthStateChanged {
                    authenticated,
                    source,
                }
            }
            names::ORDER_PLACED => Self::OrderPlaced {
                order_id: detail.get("orderId").and_then(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            },
            names::CLEAR_CART_DISPLAY => Self::CartCleared,
            names::UPDATE_CART_COUNT => {
                if !detail.is_object() {
                    return Err(invalid("expected an object"));
                }
                let snapshot = serde_json::from_value(detail.clone())
                    .map_err(|e| invalid(&e.to_string()))?;
                Self::CartCountUpdated(snapshot)
            }
            names::SHOW_MESSAGE => {
                let notification = serde_json::from_value(detail.clone())
                    .map_err(|e| invalid(&e.to_string()))?;
                Self::ShowMessage(notification)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Token carried by a login/registration detail.
///
/// Accepts `{"token": "..."}` or a bare string; blank tokens count as missing.
fn token_in(detail: &Value) -> Option<SessionToken> {
    let raw = match detail {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("token").and_then(Value::as_str),
        _ => None,
    }?;
    SessionToken::new(raw).ok()
}

/// Serde representation of a single event: `{"event": name, "detail": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TriggerEntry {
    event: String,
    #[serde(default)]
    detail: Value,
}

impl TryFrom<TriggerEntry> for ServerEvent {
    type Error = TriggerError;

    fn try_from(entry: TriggerEntry) -> Result<Self, Self::Error> {
        Self::from_parts(&entry.event, &entry.detail)?
            .ok_or(TriggerError::UnknownEvent(entry.event))
    }
}

impl From<ServerEvent> for TriggerEntry {
    fn from(event: ServerEvent) -> Self {
        Self {
            event: event.name().to_string(),
            detail: event.detail(),
        }
    }
}

/// Result of reading an `HX-Trigger` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerBatch {
    /// Events understood by this client.
    pub events: Vec<ServerEvent>,
    /// Known events whose detail could not be read.
    pub rejected: Vec<TriggerError>,
    /// Event names this client does not handle.
    pub ignored: Vec<String>,
}

impl TriggerBatch {
    fn accept(&mut self, name: &str, detail: &Value) {
        match ServerEvent::from_parts(name, detail) {
            Ok(Some(event)) => self.events.push(event),
            Ok(None) => self.ignored.push(name.to_string()),
            Err(e) => self.rejected.push(e),
        }
    }
}

/// Read an `HX-Trigger` header value.
///
/// Entries with malformed details are collected in
/// [`TriggerBatch::rejected`] instead of failing the whole header.
///
/// # Errors
///
/// Returns [`TriggerError::InvalidJson`] if the value starts like a JSON
/// object but does not parse as one.
///
/// # Example
///
/// ```
/// use secondhand_core::{ServerEvent, parse_trigger_header};
///
/// let batch = parse_trigger_header("clearCartDisplay").unwrap();
/// assert_eq!(batch.events, vec![ServerEvent::CartCleared]);
/// ```
pub fn parse_trigger_header(value: &str) -> Result<TriggerBatch, TriggerError> {
    let value = value.trim();
    let mut batch = TriggerBatch::default();

    if value.starts_with('{') {
        let entries: Map<String, Value> =
            serde_json::from_str(value).map_err(|e| TriggerError::InvalidJson(e.to_string()))?;
        for (name, detail) in &entries {
            batch.accept(name, detail);
        }
    } else {
        for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            batch.accept(name, &Value::Null);
        }
    }

    Ok(batch)
}

/// Builder for an `HX-Trigger` header.
///
/// # Example
///
/// ```
/// use secondhand_core::{Notification, ServerEvent, TriggerSet};
///
/// let header = TriggerSet::new()
///     .with(ServerEvent::ShowMessage(Notification::success("Dodano do koszyka")))
///     .to_header_value();
/// assert!(header.contains("showMessage"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    events: Vec<ServerEvent>,
}

impl TriggerSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event, builder style.
    #[must_use]
    pub fn with(mut self, event: ServerEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn push(&mut self, event: ServerEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialise as a JSON object header value. A later event with the same
    /// name replaces an earlier one.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut entries = Map::new();
        for event in &self.events {
            entries.insert(event.name().to_string(), event.detail());
        }
        Value::Object(entries).to_string()
    }
}

#[cfg(feature = "axum")]
mod axum_support {
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};

    use super::{TriggerError, TriggerSet};

    impl IntoResponseParts for TriggerSet {
        type Error = TriggerError;

        fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
            if self.is_empty() {
                return Ok(res);
            }
            let value = HeaderValue::from_str(&self.to_header_value())
                .map_err(|e| TriggerError::InvalidHeaderValue(e.to_string()))?;
            res.headers_mut()
                .insert(HeaderName::from_static("hx-trigger"), value);
            Ok(res)
        }
    }

    impl IntoResponse for TriggerError {
        fn into_response(self) -> Response {
            (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
        }
    }
}
