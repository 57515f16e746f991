//! Events consumed and effects produced by the reconciler.
//!
//! Everything here is serialisable so event scripts can be replayed and
//! effect traces compared.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use secondhand_core::trigger::names;
use secondhand_core::{AuthSource, CartSnapshot, Notification, ServerEvent};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier of a notification emitted by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Timers the reconciler asks the runtime to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimerId {
    /// Minimum display time of a notification that gates a navigation.
    NotificationHold { id: NotificationId },
    /// Fallback delay for a navigation requested without a notification.
    NavigationDelay,
    /// Layout settle time before restoring a scroll offset.
    ScrollSettle,
    /// Grace period after a back/forward cache restore.
    IndicatorGrace,
}

/// How a navigation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationMode {
    /// Partial update, new history entry.
    Push,
    /// Partial update, replaces the current history entry.
    Replace,
    /// Full page load.
    Full,
}

/// A desired view transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationIntent {
    pub path: String,
    pub mode: NavigationMode,
    /// Navigate even if the current location already matches.
    #[serde(default)]
    pub force: bool,
}

impl NavigationIntent {
    #[must_use]
    pub fn replace(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: NavigationMode::Replace,
            force: false,
        }
    }

    #[must_use]
    pub fn full(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: NavigationMode::Full,
            force: true,
        }
    }
}

/// Custom events the reconciler dispatches onto the page's event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    AuthStateChanged {
        authenticated: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<AuthSource>,
    },
    Notify {
        id: NotificationId,
        notification: Notification,
    },
    CartStateUpdated {
        cart: CartSnapshot,
    },
}

impl ClientEvent {
    /// DOM event name used when dispatching.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AuthStateChanged { .. } => names::AUTH_STATE_CHANGED,
            Self::Notify { .. } => names::SHOW_MESSAGE,
            Self::CartStateUpdated { .. } => names::CART_STATE_UPDATED,
        }
    }
}

/// Summary of a completed HTTP response, as seen by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    /// Request path, possibly with a query string.
    pub path: String,
    pub status: u16,
    /// Raw `HX-Trigger` header value.
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Inputs to the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// DOM ready on a fresh page load.
    PageLoaded { url: Url, now: DateTime<Utc> },
    /// `pageshow`; `persisted` is set on back/forward cache restores.
    PageShow { persisted: bool },
    /// A server-pushed or bus-dispatched custom event.
    Server { event: ServerEvent },
    /// The user asked to log out.
    LogoutRequested,
    /// A response arrived (any status).
    ResponseReceived { response: ResponseInfo },
    /// The request lifecycle ended.
    RequestFinished,
    /// The request could not be sent.
    SendError,
    /// The response signalled an error.
    ResponseError,
    /// A partial swap settled into `target`.
    AfterSwap {
        url: Url,
        target: String,
        #[serde(default)]
        history_restore: bool,
    },
    /// The user is about to leave via a link that should remember scroll.
    SaveScrollPosition { position: f64, url: Url },
    /// The user dismissed a notification.
    NotificationDismissed { id: NotificationId },
    TimerElapsed { timer: TimerId },
    /// A navigation issued by the reconciler finished at `url`.
    NavigationCompleted { url: Url },
    /// The host refused a navigation issued by the reconciler.
    NavigationFailed,
}

impl Event {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PageLoaded { .. } => "page_loaded",
            Self::PageShow { .. } => "page_show",
            Self::Server { event } => event.name(),
            Self::LogoutRequested => "logout_requested",
            Self::ResponseReceived { .. } => "response_received",
            Self::RequestFinished => "request_finished",
            Self::SendError => "send_error",
            Self::ResponseError => "response_error",
            Self::AfterSwap { .. } => "after_swap",
            Self::SaveScrollPosition { .. } => "save_scroll_position",
            Self::NotificationDismissed { .. } => "notification_dismissed",
            Self::TimerElapsed { .. } => "timer_elapsed",
            Self::NavigationCompleted { .. } => "navigation_completed",
            Self::NavigationFailed => "navigation_failed",
        }
    }
}

/// Outputs of the reconciler, executed by a [`Host`](crate::Host).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum Effect {
    Navigate {
        intent: NavigationIntent,
    },
    Dispatch {
        event: ClientEvent,
    },
    StartTimer {
        timer: TimerId,
        #[serde(rename = "afterMs", with = "duration_ms")]
        after: Duration,
    },
    ScrollTo {
        position: f64,
    },
    ScrollToTop,
    ShowIndicator,
    HideIndicator,
    ClearFormErrors {
        containers: Vec<String>,
    },
    /// Abort the outbound partial request being prepared.
    CancelRequest,
}

impl Effect {
    pub(crate) fn dispatch(event: ClientEvent) -> Self {
        Self::Dispatch { event }
    }

    pub(crate) fn auth_changed(authenticated: bool, source: Option<AuthSource>) -> Self {
        Self::dispatch(ClientEvent::AuthStateChanged {
            authenticated,
            source,
        })
    }

    pub(crate) fn cart_updated(cart: CartSnapshot) -> Self {
        Self::dispatch(ClientEvent::CartStateUpdated { cart })
    }
}

/// An outbound partial-update request about to be sent.
#[derive(Debug, Clone, Default)]
pub struct OutboundRequest {
    /// Request path, possibly with a query string.
    pub path: String,
    pub headers: HeaderMap,
    /// Replays a prior navigation for back/forward support.
    pub history_restore: bool,
}

impl OutboundRequest {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)] // Timer delays are far below u64::MAX ms
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
