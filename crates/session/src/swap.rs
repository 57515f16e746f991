//! Reconciliation after partial swaps and responses.

use secondhand_core::{Notification, SessionToken, parse_trigger_header};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::event::{Effect, ResponseInfo};
use crate::lifecycle::UNAUTHORIZED;
use crate::reconciler::Reconciler;
use crate::scroll::RestoreCheck;
use crate::store::KeyValueStorage;

impl<S: KeyValueStorage> Reconciler<S> {
    /// A partial swap settled into `target` at `url`.
    pub(crate) fn after_swap(
        &mut self,
        url: Url,
        target: &str,
        history_restore: bool,
        effects: &mut Vec<Effect>,
    ) {
        self.navigator.set_location(url.clone());
        if target != self.config.main_target {
            return;
        }

        if !self.config.routes.is_auth_view(url.path())
            && !self.config.form_error_containers.is_empty()
        {
            effects.push(Effect::ClearFormErrors {
                containers: self.config.form_error_containers.clone(),
            });
        }

        if history_restore {
            debug!(%url, "History restore keeps scroll position");
            return;
        }
        if !self.restore_scroll_if_applicable(&url, RestoreCheck::Swap, effects) {
            effects.push(Effect::ScrollToTop);
        }
    }

    /// Inspect a response's trigger header, status and body.
    pub(crate) fn inspect_response(&mut self, response: &ResponseInfo, effects: &mut Vec<Effect>) {
        if let Some(raw) = response.trigger.as_deref() {
            self.apply_trigger_header(raw, effects);
        }

        self.on_auth_failure(response.status, &response.path, effects);

        if let Some(body) = response.body.as_deref() {
            // Non-JSON bodies are expected (HTML fragments).
            if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(body) {
                self.inspect_body(response, &body, effects);
            }
        }
    }

    fn apply_trigger_header(&mut self, raw: &str, effects: &mut Vec<Effect>) {
        let batch = match parse_trigger_header(raw) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Unreadable trigger header");
                return;
            }
        };
        for e in &batch.rejected {
            warn!(error = %e, "Skipping trigger event");
        }
        if !batch.ignored.is_empty() {
            debug!(ignored = ?batch.ignored, "Unhandled trigger events");
        }
        for event in batch.events {
            self.on_server_event(event, effects);
        }
    }

    fn inspect_body(
        &mut self,
        response: &ResponseInfo,
        body: &Map<String, Value>,
        effects: &mut Vec<Effect>,
    ) {
        let status = response.status;

        if let Some(detail) = body.get("showMessage") {
            match serde_json::from_value::<Notification>(detail.clone()) {
                Ok(notification) => {
                    self.notify(notification, effects);
                }
                Err(e) => debug!(error = %e, "Ignoring malformed showMessage payload"),
            }
        } else if status >= 400 && status != UNAUTHORIZED {
            let message = ["message", "error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str));
            if let Some(message) = message {
                self.notify(Notification::error(message), effects);
            }
        }

        if (200..300).contains(&status) && self.config.routes.is_auth_endpoint(&response.path) {
            self.accept_in_band_token(response, body, effects);
        }
    }

    fn accept_in_band_token(
        &mut self,
        response: &ResponseInfo,
        body: &Map<String, Value>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(token) = body
            .get("token")
            .and_then(Value::as_str)
            .and_then(|raw| SessionToken::new(raw).ok())
        else {
            return;
        };
        if self.store.token().as_ref() == Some(&token) {
            debug!("In-band token already stored");
            return;
        }

        if self.config.routes.is_login_endpoint(&response.path) {
            self.on_login_succeeded(Some(token), effects);
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(String::from);
            self.on_registration_completed(Some(token), message, effects);
        }
    }
}
