//! The session reconciler state machine.

use secondhand_core::{CartSnapshot, Notification, ServerEvent};
use tracing::{debug, info};
use url::Url;

use crate::config::ReconcilerConfig;
use crate::event::{ClientEvent, Effect, Event, NotificationId, TimerId};
use crate::lifecycle::messages;
use crate::machine::{AuthPhase, Transition};
use crate::navigation::{Gate, Navigator};
use crate::scroll::RestoreCheck;
use crate::store::{KeyValueStorage, SessionStore};

/// Consumes [`Event`]s and decides which [`Effect`]s to run.
///
/// Never blocks and never fails: storage problems are logged and the event
/// is handled as if the storage were empty.
#[derive(Debug)]
pub struct Reconciler<S> {
    pub(crate) config: ReconcilerConfig,
    pub(crate) store: SessionStore<S>,
    pub(crate) phase: AuthPhase,
    pub(crate) navigator: Navigator,
    pub(crate) pending_scroll: Option<(f64, Url)>,
    next_notification: u64,
}

impl<S: KeyValueStorage> Reconciler<S> {
    pub fn new(storage: S, config: ReconcilerConfig) -> Self {
        let store = SessionStore::new(storage);
        let phase = AuthPhase::initial(store.token().is_some());
        Self {
            config,
            store,
            phase,
            navigator: Navigator::new(),
            pending_scroll: None,
            next_notification: 0,
        }
    }

    /// Handle one event.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::PageLoaded { url, now } => {
                self.phase = AuthPhase::initial(self.store.token().is_some());
                self.navigator.set_location(url.clone());
                if !self.check_stored_session_validity(now, &mut effects) {
                    self.restore_scroll_if_applicable(&url, RestoreCheck::PageLoad, &mut effects);
                }
            }
            Event::PageShow { persisted } => self.on_page_show(persisted, &mut effects),
            Event::Server { event } => self.on_server_event(event, &mut effects),
            Event::LogoutRequested => self.on_logout_requested(&mut effects),
            Event::ResponseReceived { response } => self.inspect_response(&response, &mut effects),
            Event::RequestFinished | Event::SendError | Event::ResponseError => {
                effects.push(Effect::HideIndicator);
            }
            Event::AfterSwap {
                url,
                target,
                history_restore,
            } => self.after_swap(url, &target, history_restore, &mut effects),
            Event::SaveScrollPosition { position, url } => {
                self.save_scroll_position(position, &url);
            }
            Event::NotificationDismissed { id } => {
                self.open_gate(Gate::Notification(id), &mut effects);
            }
            Event::TimerElapsed { timer } => self.on_timer(timer, &mut effects),
            Event::NavigationCompleted { url } => self.on_navigation_completed(url),
            Event::NavigationFailed => self.on_navigation_failed(),
        }
        effects
    }

    pub(crate) fn on_server_event(&mut self, event: ServerEvent, effects: &mut Vec<Effect>) {
        debug!(event = event.name(), "Server event");
        match event {
            ServerEvent::LoginSucceeded { token } => self.on_login_succeeded(token, effects),
            ServerEvent::RegistrationCompleted { token, message } => {
                self.on_registration_completed(token, message, effects);
            }
            ServerEvent::AuthStateChanged {
                authenticated,
                source,
            } => self.on_auth_state_changed(authenticated, source, effects),
            ServerEvent::OrderPlaced { order_id } => {
                info!(order_id = order_id.as_deref().unwrap_or("-"), "Order placed");
                self.store.clear_guest_cart_id();
                effects.push(Effect::cart_updated(CartSnapshot::empty()));
                self.notify(Notification::success(messages::ORDER_PLACED), effects);
            }
            ServerEvent::CartCleared => effects.push(Effect::cart_updated(CartSnapshot::empty())),
            ServerEvent::CartCountUpdated(snapshot) => {
                if let Some(id) = snapshot.guest_cart_id {
                    if self.phase.is_authenticated() {
                        debug!("Ignoring guest cart id for an authenticated session");
                    } else if self.store.guest_cart_id() != Some(id) {
                        info!(guest_cart_id = %id, "Adopting guest cart");
                        self.store.set_guest_cart_id(id);
                    }
                }
                effects.push(Effect::cart_updated(snapshot));
            }
            ServerEvent::ShowMessage(notification) => {
                self.notify(notification, effects);
            }
        }
    }

    fn on_timer(&mut self, timer: TimerId, effects: &mut Vec<Effect>) {
        if let Some(gate) = Gate::opened_by(timer) {
            self.open_gate(gate, effects);
            return;
        }
        match timer {
            TimerId::ScrollSettle => self.on_scroll_settled(effects),
            TimerId::IndicatorGrace => effects.push(Effect::HideIndicator),
            TimerId::NotificationHold { .. } | TimerId::NavigationDelay => {}
        }
    }

    /// Show a notification.
    pub(crate) fn notify(
        &mut self,
        notification: Notification,
        effects: &mut Vec<Effect>,
    ) -> NotificationId {
        self.next_notification += 1;
        let id = NotificationId::new(self.next_notification);
        effects.push(Effect::dispatch(ClientEvent::Notify { id, notification }));
        id
    }

    /// Show a notification that gates a navigation, with its minimum display
    /// timer.
    pub(crate) fn notify_held(
        &mut self,
        notification: Notification,
        effects: &mut Vec<Effect>,
    ) -> NotificationId {
        let id = self.notify(notification, effects);
        effects.push(Effect::StartTimer {
            timer: TimerId::NotificationHold { id },
            after: self.config.notification_min_display,
        });
        id
    }

    /// Apply `transition` if it is legal from the current phase.
    pub(crate) fn transition(&mut self, transition: Transition) -> bool {
        let Some(next) = self.phase.next(transition) else {
            return false;
        };
        if next != self.phase {
            debug!(from = ?self.phase, to = ?next, ?transition, "Auth phase changed");
        }
        self.phase = next;
        true
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn phase(&self) -> AuthPhase {
        self.phase
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn into_storage(self) -> S {
        self.store.into_backend()
    }
}
