//! Scroll position memory across reloads.
//!
//! Before leaving a listing for a detail view the page records its scroll
//! offset together with its URL. When that exact URL is shown again the offset
//! is restored once and the record is dropped.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::event::{Effect, TimerId};
use crate::reconciler::Reconciler;
use crate::store::KeyValueStorage;

/// A remembered scroll offset and the URL it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMemory {
    pub position: f64,
    pub return_url: String,
}

impl ScrollMemory {
    #[must_use]
    pub fn new(position: f64, return_url: &Url) -> Self {
        Self {
            position,
            return_url: return_url.to_string(),
        }
    }

    /// Whether this memory was recorded at `url`.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        Url::parse(&self.return_url).is_ok_and(|saved| &saved == url)
    }
}

/// When a restore check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RestoreCheck {
    /// Fresh page load; a memory for another URL is stale.
    PageLoad,
    /// After a partial swap; a memory for another URL may still be reached
    /// by a later navigation.
    Swap,
}

impl<S: KeyValueStorage> Reconciler<S> {
    pub(crate) fn save_scroll_position(&mut self, position: f64, url: &Url) {
        debug!(position, %url, "Remembering scroll position");
        self.store.set_scroll_memory(&ScrollMemory::new(position, url));
    }

    /// Schedule a restore if the stored memory belongs to `url`.
    ///
    /// Returns `true` while a restore is scheduled for this page. A restore
    /// scheduled for another page is dropped.
    pub(crate) fn restore_scroll_if_applicable(
        &mut self,
        url: &Url,
        check: RestoreCheck,
        effects: &mut Vec<Effect>,
    ) -> bool {
        if let Some((_, pending_url)) = &self.pending_scroll {
            if pending_url == url {
                return true;
            }
            debug!(%pending_url, %url, "Left the page before scroll restore");
            self.pending_scroll = None;
        }

        let memory = match self.store.scroll_memory() {
            Ok(Some(memory)) => memory,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Dropping unreadable scroll memory");
                self.store.clear_scroll_memory();
                return false;
            }
        };

        if !memory.matches(url) {
            if check == RestoreCheck::PageLoad {
                debug!(saved = %memory.return_url, %url, "Dropping stale scroll memory");
                self.store.clear_scroll_memory();
            }
            return false;
        }

        self.pending_scroll = Some((memory.position, url.clone()));
        effects.push(Effect::StartTimer {
            timer: TimerId::ScrollSettle,
            after: self.config.scroll_settle_delay,
        });
        true
    }

    /// Layout has settled; apply the scheduled restore.
    pub(crate) fn on_scroll_settled(&mut self, effects: &mut Vec<Effect>) {
        if let Some((position, _)) = self.pending_scroll.take() {
            effects.push(Effect::ScrollTo { position });
            self.store.clear_scroll_memory();
        }
    }
}
