//! Navigation decisions.
//!
//! A navigation is either issued immediately or parked behind a [`Gate`]
//! until a completion signal arrives. Only one navigation can be parked or in
//! flight at a time; parking a new one replaces the old one.

use secondhand_core::{AuthSource, path_only};
use tracing::{debug, info};
use url::Url;

use crate::event::{Effect, NavigationIntent, NotificationId, TimerId};
use crate::machine::{AuthPhase, Transition};
use crate::reconciler::Reconciler;
use crate::store::KeyValueStorage;

/// Signal a parked navigation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The notification was dismissed or its minimum display time elapsed.
    Notification(NotificationId),
    /// The plain navigation delay elapsed.
    Delay,
}

impl Gate {
    /// The gate a timer opens, if any.
    #[must_use]
    pub const fn opened_by(timer: TimerId) -> Option<Self> {
        match timer {
            TimerId::NotificationHold { id } => Some(Self::Notification(id)),
            TimerId::NavigationDelay => Some(Self::Delay),
            TimerId::ScrollSettle | TimerId::IndicatorGrace => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingNavigation {
    intent: NavigationIntent,
    gate: Gate,
}

/// Tracks the current location and the single outstanding navigation.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    location: Option<Url>,
    pending: Option<PendingNavigation>,
    in_flight: Option<NavigationIntent>,
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, url: Url) {
        self.location = Some(url);
    }

    /// Whether a navigation is parked or in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some() || self.in_flight.is_some()
    }

    #[must_use]
    pub fn pending_intent(&self) -> Option<&NavigationIntent> {
        self.pending.as_ref().map(|p| &p.intent)
    }

    /// Whether the parked or in-flight navigation leads to `path`.
    #[must_use]
    pub fn is_heading_to(&self, path: &str) -> bool {
        self.pending_intent()
            .or(self.in_flight.as_ref())
            .is_some_and(|intent| path_only(&intent.path) == path_only(path))
    }

    /// Whether `intent` points at the current location.
    #[must_use]
    pub fn is_current(&self, intent: &NavigationIntent) -> bool {
        self.location
            .as_ref()
            .is_some_and(|url| url.path() == path_only(&intent.path))
    }

    /// Park `intent` until `gate` opens, replacing any parked navigation.
    pub fn park(&mut self, intent: NavigationIntent, gate: Gate) {
        if let Some(previous) = self.pending.replace(PendingNavigation { intent, gate }) {
            debug!(path = %previous.intent.path, "Superseded parked navigation");
        }
    }

    /// Take the parked navigation if it waits for `gate`.
    pub fn open(&mut self, gate: Gate) -> Option<NavigationIntent> {
        if self.pending.as_ref().is_some_and(|p| p.gate == gate) {
            return self.pending.take().map(|p| p.intent);
        }
        None
    }

    /// Issue `intent` now. Returns `None` when it would not move anywhere.
    pub fn issue(&mut self, intent: NavigationIntent) -> Option<Effect> {
        self.pending = None;
        if !intent.force && self.is_current(&intent) {
            debug!(path = %intent.path, "Already at navigation target");
            return None;
        }
        self.in_flight = Some(intent.clone());
        Some(Effect::Navigate { intent })
    }

    /// The in-flight navigation finished at `url`.
    pub fn complete(&mut self, url: Url) {
        self.in_flight = None;
        self.location = Some(url);
    }

    /// The in-flight navigation was refused by the host.
    pub fn fail(&mut self) {
        self.in_flight = None;
    }
}

impl<S: KeyValueStorage> Reconciler<S> {
    /// React to an authentication-state signal from the server.
    pub(crate) fn on_auth_state_changed(
        &mut self,
        authenticated: bool,
        source: Option<AuthSource>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(source) = source else {
            debug!(authenticated, "Informational auth state change");
            return;
        };

        match (source, authenticated) {
            (AuthSource::Login, true) => {
                if self.navigator.is_busy() {
                    debug!(source = source.as_str(), "Navigation already pending");
                    return;
                }
                let landing = NavigationIntent::replace(self.config.routes.landing.clone());
                self.navigate(landing, effects);
            }
            (AuthSource::Logout | AuthSource::Unauthorized, false) => {
                if self.store.token_entry().is_some() {
                    self.store.clear_token();
                }
                let transition = if source == AuthSource::Logout {
                    Transition::LoggedOut
                } else {
                    Transition::SessionLost
                };
                self.transition(transition);

                let home = &self.config.routes.home;
                if self.navigator.is_heading_to(home) {
                    debug!(source = source.as_str(), "Already heading home");
                    return;
                }
                // Replaces a parked landing navigation from an earlier login.
                let home = NavigationIntent::replace(home.clone());
                self.park_navigation(home, Gate::Delay, effects);
            }
            _ => debug!(authenticated, source = source.as_str(), "Inconsistent auth state change"),
        }
    }

    /// Park a navigation behind `gate`. A [`Gate::Delay`] starts its timer.
    pub(crate) fn park_navigation(
        &mut self,
        intent: NavigationIntent,
        gate: Gate,
        effects: &mut Vec<Effect>,
    ) {
        debug!(path = %intent.path, ?gate, "Parked navigation");
        self.navigator.park(intent, gate);
        if gate == Gate::Delay {
            effects.push(Effect::StartTimer {
                timer: TimerId::NavigationDelay,
                after: self.config.notification_min_display,
            });
        }
    }

    /// Release the parked navigation waiting for `gate`, if any.
    pub(crate) fn open_gate(&mut self, gate: Gate, effects: &mut Vec<Effect>) {
        if let Some(intent) = self.navigator.open(gate) {
            self.navigate(intent, effects);
        }
    }

    /// Issue a navigation now.
    pub(crate) fn navigate(&mut self, intent: NavigationIntent, effects: &mut Vec<Effect>) {
        if let Some(effect) = self.navigator.issue(intent) {
            info!(?effect, "Navigating");
            effects.push(effect);
        } else {
            self.settle_session();
        }
    }

    pub(crate) fn on_navigation_completed(&mut self, url: Url) {
        debug!(%url, "Navigation completed");
        self.navigator.complete(url);
        self.settle_session();
    }

    pub(crate) fn on_navigation_failed(&mut self) {
        self.navigator.fail();
        self.settle_session();
    }

    /// Finish a session teardown once no navigation is outstanding.
    fn settle_session(&mut self) {
        if self.phase == AuthPhase::SessionExpiring && !self.navigator.is_busy() {
            self.transition(Transition::NavigationSettled);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://sklep.example").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_issue_skips_current_location() {
        let mut nav = Navigator::new();
        nav.set_location(url("/moje-konto?tab=zamowienia"));
        assert!(nav.issue(NavigationIntent::replace("/moje-konto")).is_none());
        assert!(!nav.is_busy());
    }

    #[test]
    fn test_force_overrides_idempotence() {
        let mut nav = Navigator::new();
        nav.set_location(url("/"));
        let effect = nav.issue(NavigationIntent::full("/")).unwrap();
        assert!(matches!(effect, Effect::Navigate { .. }));
        assert!(nav.is_busy());
        nav.complete(url("/"));
        assert!(!nav.is_busy());
    }

    #[test]
    fn test_unknown_location_always_navigates() {
        let mut nav = Navigator::new();
        assert!(nav.issue(NavigationIntent::replace("/")).is_some());
    }

    #[test]
    fn test_park_and_open() {
        let mut nav = Navigator::new();
        let id = NotificationId::new(1);
        nav.park(NavigationIntent::replace("/moje-konto"), Gate::Notification(id));
        assert!(nav.is_busy());

        assert!(nav.open(Gate::Delay).is_none());
        assert!(nav.open(Gate::Notification(NotificationId::new(2))).is_none());
        let intent = nav.open(Gate::Notification(id)).unwrap();
        assert_eq!(intent.path, "/moje-konto");

        // Second signal for the same gate finds nothing.
        assert!(nav.open(Gate::Notification(id)).is_none());
    }

    #[test]
    fn test_park_supersedes() {
        let mut nav = Navigator::new();
        nav.park(NavigationIntent::replace("/moje-konto"), Gate::Delay);
        nav.park(NavigationIntent::replace("/"), Gate::Delay);
        assert_eq!(nav.pending_intent().unwrap().path, "/");
        assert_eq!(nav.open(Gate::Delay).unwrap().path, "/");
        assert!(!nav.is_busy());
    }

    #[test]
    fn test_heading_to_parked_or_in_flight() {
        let mut nav = Navigator::new();
        assert!(!nav.is_heading_to("/"));
        nav.park(NavigationIntent::replace("/moje-konto"), Gate::Delay);
        assert!(nav.is_heading_to("/moje-konto"));
        assert!(!nav.is_heading_to("/"));

        let intent = nav.open(Gate::Delay).unwrap();
        nav.issue(intent);
        assert!(nav.is_heading_to("/moje-konto?tab=zamowienia"));
    }

    #[test]
    fn test_gate_for_timer() {
        let id = NotificationId::new(7);
        assert_eq!(
            Gate::opened_by(TimerId::NotificationHold { id }),
            Some(Gate::Notification(id))
        );
        assert_eq!(Gate::opened_by(TimerId::NavigationDelay), Some(Gate::Delay));
        assert_eq!(Gate::opened_by(TimerId::ScrollSettle), None);
    }
}
