//! Global loading indicator and outbound request gate.

use secondhand_core::path_only;
use tracing::debug;

use crate::decorator::decorate;
use crate::event::{Effect, NavigationIntent, OutboundRequest, TimerId};
use crate::machine::Transition;
use crate::reconciler::Reconciler;
use crate::store::KeyValueStorage;

const ROOT: &str = "/";

impl<S: KeyValueStorage> Reconciler<S> {
    /// Prepare an outbound partial request.
    ///
    /// Requests for the root path are cancelled and replaced by a full page
    /// load. History restores go out undecorated by the indicator. Everything
    /// else shows the indicator and carries the session headers.
    pub fn before_request(&mut self, request: &mut OutboundRequest) -> Vec<Effect> {
        let mut effects = Vec::new();

        if path_only(&request.path) == ROOT && !request.history_restore {
            debug!(path = %request.path, "Root request becomes a full load");
            effects.push(Effect::CancelRequest);
            self.navigate(NavigationIntent::full(ROOT), &mut effects);
            return effects;
        }

        decorate(&self.store, &mut request.headers);

        if request.history_restore {
            return effects;
        }
        if self.config.routes.is_login_endpoint(&request.path) {
            self.transition(Transition::LoginSubmitted);
        }
        effects.push(Effect::ShowIndicator);
        effects
    }

    /// A back/forward cache restore may have lost the completion of an
    /// in-flight request.
    pub(crate) fn on_page_show(&self, persisted: bool, effects: &mut Vec<Effect>) {
        if persisted {
            effects.push(Effect::StartTimer {
                timer: TimerId::IndicatorGrace,
                after: self.config.bfcache_grace,
            });
        }
    }
}
