//! Event script replay.
//!
//! Reads one [`Event`] per line (blank lines and `#` comments are skipped),
//! runs them through a [`Runtime`] backed by in-memory storage and prints
//! every host call as a JSON line. Pending timers fire after the last event.

use std::path::Path;

use secondhand_core::GuestCartId;
use secondhand_session::store::keys;
use secondhand_session::{
    ClientEvent, ConfigError, Event, Host, HostError, MemoryStorage, NavigationIntent, Reconciler,
    ReconcilerConfig, Runtime,
};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Origin used for navigations before any page has loaded.
const DEFAULT_ORIGIN: &str = "http://localhost/";

/// Errors that can occur while replaying a script.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid guest cart id: {0}")]
    GuestCart(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A call made on the host, as printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum HostCall {
    Navigate { intent: NavigationIntent, url: Url },
    Dispatch { name: String, event: ClientEvent },
    ScrollTo { position: f64 },
    ScrollToTop,
    SetIndicator { visible: bool },
    ClearFormErrors { containers: Vec<String> },
}

/// Host that records calls and resolves navigations against the last
/// loaded page.
#[derive(Debug)]
pub struct PrintHost {
    origin: Option<Url>,
    calls: Vec<HostCall>,
    echo: bool,
}

impl PrintHost {
    /// `echo` prints every call to stdout as it happens.
    #[must_use]
    pub const fn new(echo: bool) -> Self {
        Self {
            origin: None,
            calls: Vec::new(),
            echo,
        }
    }

    #[must_use]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        match &self.origin {
            Some(origin) => origin.join(path),
            None => Url::parse(DEFAULT_ORIGIN)?.join(path),
        }
    }

    fn record(&mut self, call: HostCall) {
        if self.echo {
            match serde_json::to_string(&call) {
                Ok(line) => {
                    #[allow(clippy::print_stdout)]
                    {
                        println!("{line}");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode host call"),
            }
        }
        self.calls.push(call);
    }
}

impl Host for PrintHost {
    async fn navigate(&mut self, intent: &NavigationIntent) -> Result<Url, HostError> {
        let url = self
            .resolve(&intent.path)
            .map_err(|e| HostError::Navigation(e.to_string()))?;
        self.record(HostCall::Navigate {
            intent: intent.clone(),
            url: url.clone(),
        });
        Ok(url)
    }

    async fn dispatch(&mut self, event: &ClientEvent) -> Result<(), HostError> {
        self.record(HostCall::Dispatch {
            name: event.name().to_string(),
            event: event.clone(),
        });
        Ok(())
    }

    async fn scroll_to(&mut self, position: f64) -> Result<(), HostError> {
        self.record(HostCall::ScrollTo { position });
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), HostError> {
        self.record(HostCall::ScrollToTop);
        Ok(())
    }

    async fn set_indicator(&mut self, visible: bool) -> Result<(), HostError> {
        self.record(HostCall::SetIndicator { visible });
        Ok(())
    }

    async fn clear_form_errors(&mut self, containers: &[String]) -> Result<(), HostError> {
        self.record(HostCall::ClearFormErrors {
            containers: containers.to_vec(),
        });
        Ok(())
    }
}

/// Parse a JSON-lines event script.
///
/// # Errors
///
/// Returns [`ReplayError::Parse`] with the 1-based line number of the first
/// line that is not a valid event.
pub fn parse_script(script: &str) -> Result<Vec<Event>, ReplayError> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| ReplayError::Parse {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Seed storage the way a returning visitor's browser would hold it.
///
/// # Errors
///
/// Returns [`ReplayError::GuestCart`] if `guest_cart` is not a UUID.
pub fn seed_storage(
    token: Option<&str>,
    guest_cart: Option<&str>,
) -> Result<MemoryStorage, ReplayError> {
    let mut storage = MemoryStorage::new();
    if let Some(token) = token {
        storage = storage.with_entry(keys::TOKEN, token);
    }
    if let Some(raw) = guest_cart {
        let id = GuestCartId::parse(raw).map_err(|e| ReplayError::GuestCart(e.to_string()))?;
        storage = storage.with_entry(keys::GUEST_CART_ID, &id.to_string());
    }
    Ok(storage)
}

/// Replay `events` and return the host afterwards.
pub async fn replay_events(
    events: Vec<Event>,
    storage: MemoryStorage,
    config: ReconcilerConfig,
    host: PrintHost,
) -> Runtime<MemoryStorage, PrintHost> {
    let mut runtime = Runtime::new(Reconciler::new(storage, config), host);
    for event in events {
        if let Event::PageLoaded { url, .. } = &event {
            runtime.host_mut().origin = Some(url.clone());
        }
        runtime.handle(event).await;
    }
    runtime.settle().await;
    runtime
}

/// Replay the script at `path`, printing host calls to stdout.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a line is not a valid event,
/// the guest cart id is invalid or the configuration is invalid.
pub async fn run(
    path: &Path,
    token: Option<&str>,
    guest_cart: Option<&str>,
) -> Result<(), ReplayError> {
    let script = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReplayError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let events = parse_script(&script)?;
    let storage = seed_storage(token, guest_cart)?;
    let config = ReconcilerConfig::from_env()?;

    tracing::info!(events = events.len(), "Replaying script");
    let runtime = replay_events(events, storage, config, PrintHost::new(true)).await;
    tracing::info!(
        calls = runtime.host().calls().len(),
        phase = ?runtime.reconciler().phase(),
        "Replay finished"
    );
    Ok(())
}
