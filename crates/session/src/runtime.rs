//! Async driver executing reconciler effects.
//!
//! The runtime owns the [`Reconciler`] and a [`Host`]. Timers run as tokio
//! sleeps in a [`JoinSet`]; their completion, and the outcome of every
//! navigation, are fed back into the reconciler as events.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::HostError;
use crate::event::{ClientEvent, Effect, Event, NavigationIntent, OutboundRequest, TimerId};
use crate::reconciler::Reconciler;
use crate::store::KeyValueStorage;

/// The page the reconciler drives.
#[allow(async_fn_in_trait)]
pub trait Host {
    /// Carry out a navigation and report where the page ended up.
    async fn navigate(&mut self, intent: &NavigationIntent) -> Result<Url, HostError>;

    /// Dispatch a custom event on the page's event bus.
    async fn dispatch(&mut self, event: &ClientEvent) -> Result<(), HostError>;

    async fn scroll_to(&mut self, position: f64) -> Result<(), HostError>;

    async fn scroll_to_top(&mut self) -> Result<(), HostError>;

    /// Show or hide the global loading indicator.
    async fn set_indicator(&mut self, visible: bool) -> Result<(), HostError>;

    /// Empty the given inline form-error containers.
    async fn clear_form_errors(&mut self, containers: &[String]) -> Result<(), HostError>;
}

/// Executes effects against a [`Host`] and runs timers.
#[derive(Debug)]
pub struct Runtime<S, H> {
    reconciler: Reconciler<S>,
    host: H,
    timers: JoinSet<TimerId>,
}

impl<S: KeyValueStorage, H: Host> Runtime<S, H> {
    pub fn new(reconciler: Reconciler<S>, host: H) -> Self {
        Self {
            reconciler,
            host,
            timers: JoinSet::new(),
        }
    }

    /// Handle an event and everything it leads to, except timers.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn handle(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for effect in self.reconciler.handle(event) {
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Prepare an outbound request. Returns `false` if it must not be sent.
    #[instrument(skip_all, fields(path = %request.path))]
    pub async fn before_request(&mut self, request: &mut OutboundRequest) -> bool {
        let effects = self.reconciler.before_request(request);
        let proceed = !effects.contains(&Effect::CancelRequest);
        let mut queue = VecDeque::new();
        for effect in effects {
            if let Some(follow_up) = self.execute(effect).await {
                queue.push_back(follow_up);
            }
        }
        for event in queue {
            self.handle(event).await;
        }
        proceed
    }

    /// Process events until the channel closes. Timers keep firing while
    /// waiting for events.
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                Some(joined) = self.timers.join_next() => self.on_timer_joined(joined).await,
            }
        }
        debug!(pending_timers = self.timers.len(), "Event channel closed");
    }

    /// Run until no timer is left.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.timers.join_next().await {
            self.on_timer_joined(joined).await;
        }
    }

    async fn on_timer_joined(&mut self, joined: Result<TimerId, JoinError>) {
        match joined {
            Ok(timer) => self.handle(Event::TimerElapsed { timer }).await,
            Err(e) => warn!(error = %e, "Timer task failed"),
        }
    }

    /// Run one effect. Returns the event it produced, if any.
    async fn execute(&mut self, effect: Effect) -> Option<Event> {
        let result = match effect {
            Effect::Navigate { intent } => {
                return Some(match self.host.navigate(&intent).await {
                    Ok(url) => Event::NavigationCompleted { url },
                    Err(e) => {
                        warn!(error = %e, path = %intent.path, "Navigation failed");
                        Event::NavigationFailed
                    }
                });
            }
            Effect::StartTimer { timer, after } => {
                debug!(?timer, ?after, "Starting timer");
                self.timers.spawn(async move {
                    tokio::time::sleep(after).await;
                    timer
                });
                return None;
            }
            Effect::CancelRequest => {
                debug!("Outbound request cancelled");
                return None;
            }
            Effect::Dispatch { event } => self.host.dispatch(&event).await,
            Effect::ScrollTo { position } => self.host.scroll_to(position).await,
            Effect::ScrollToTop => self.host.scroll_to_top().await,
            Effect::ShowIndicator => self.host.set_indicator(true).await,
            Effect::HideIndicator => self.host.set_indicator(false).await,
            Effect::ClearFormErrors { containers } => {
                self.host.clear_form_errors(&containers).await
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Host failed to apply effect");
        }
        None
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub const fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Number of timers still running.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn into_parts(self) -> (Reconciler<S>, H) {
        (self.reconciler, self.host)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secondhand_core::{ServerEvent, SessionToken};

    use super::*;
    use crate::config::ReconcilerConfig;
    use crate::store::{MemoryStorage, keys};

    #[derive(Debug, Default)]
    struct FakeHost {
        origin: Option<Url>,
        navigations: Vec<String>,
        dispatched: Vec<ClientEvent>,
        indicator: bool,
        refuse_navigation: bool,
    }

    impl Host for FakeHost {
        async fn navigate(&mut self, intent: &NavigationIntent) -> Result<Url, HostError> {
            if self.refuse_navigation {
                return Err(HostError::Navigation("refused".to_string()));
            }
            self.navigations.push(intent.path.clone());
            let origin = self
                .origin
                .clone()
                .unwrap_or_else(|| Url::parse("https://sklep.example").unwrap());
            origin
                .join(&intent.path)
                .map_err(|e| HostError::Navigation(e.to_string()))
        }

        async fn dispatch(&mut self, event: &ClientEvent) -> Result<(), HostError> {
            self.dispatched.push(event.clone());
            Ok(())
        }

        async fn scroll_to(&mut self, _position: f64) -> Result<(), HostError> {
            Ok(())
        }

        async fn scroll_to_top(&mut self) -> Result<(), HostError> {
            Ok(())
        }

        async fn set_indicator(&mut self, visible: bool) -> Result<(), HostError> {
            self.indicator = visible;
            Ok(())
        }

        async fn clear_form_errors(&mut self, containers: &[String]) -> Result<(), HostError> {
            Err(HostError::MissingElement(containers.join(",")))
        }
    }

    fn runtime() -> Runtime<MemoryStorage, FakeHost> {
        Runtime::new(
            Reconciler::new(MemoryStorage::new(), ReconcilerConfig::default()),
            FakeHost::default(),
        )
    }

    fn login(token: &str) -> Event {
        Event::Server {
            event: ServerEvent::LoginSucceeded {
                token: Some(SessionToken::new(token).unwrap()),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_navigates_after_hold() {
        let mut rt = runtime();
        rt.handle(login("abc123")).await;
        assert!(rt.host().navigations.is_empty());
        assert_eq!(rt.pending_timers(), 1);

        rt.settle().await;
        assert_eq!(rt.host().navigations, vec!["/moje-konto"]);
        assert_eq!(
            rt.reconciler().store().backend().peek(keys::TOKEN),
            Some("abc123")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_wins_over_hold() {
        let mut rt = runtime();
        rt.handle(login("abc123")).await;
        let id = rt
            .host()
            .dispatched
            .iter()
            .find_map(|e| match e {
                ClientEvent::Notify { id, .. } => Some(*id),
                _ => None,
            })
            .unwrap();

        rt.handle(Event::NotificationDismissed { id }).await;
        assert_eq!(rt.host().navigations.len(), 1);

        rt.settle().await;
        assert_eq!(rt.host().navigations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fires_timers_while_waiting() {
        let mut rt = runtime();
        let (tx, rx) = mpsc::channel(8);
        tx.send(login("abc123")).await.unwrap();

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(tx);
        });
        rt.run(rx).await;
        sender.await.unwrap();

        assert_eq!(rt.host().navigations, vec!["/moje-konto"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_request_is_cancelled() {
        let mut rt = runtime();
        let mut request = OutboundRequest::new("/");
        assert!(!rt.before_request(&mut request).await);
        assert_eq!(rt.host().navigations, vec!["/"]);
        assert!(!rt.reconciler().navigator().is_busy());

        let mut request = OutboundRequest::new("/produkty");
        assert!(rt.before_request(&mut request).await);
        assert!(rt.host().indicator);
        rt.handle(Event::RequestFinished).await;
        assert!(!rt.host().indicator);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_navigation_is_released() {
        let mut rt = runtime();
        rt.host_mut().refuse_navigation = true;
        rt.handle(login("abc123")).await;
        rt.settle().await;
        assert!(rt.host().navigations.is_empty());
        assert!(!rt.reconciler().navigator().is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_errors_do_not_stop_processing() {
        let mut rt = runtime();
        rt.handle(Event::AfterSwap {
            url: Url::parse("https://sklep.example/produkty").unwrap(),
            target: "content".to_string(),
            history_restore: false,
        })
        .await;
        rt.handle(Event::PageShow { persisted: true }).await;
        rt.host_mut().indicator = true;
        rt.settle().await;
        assert!(!rt.host().indicator);
    }
}
