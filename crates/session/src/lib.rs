//! Secondhand session reconciler.
//!
//! Keeps an htmx-driven storefront consistent with a server-issued bearer
//! token, a guest cart identity and browser history semantics.
//!
//! # Architecture
//!
//! The [`Reconciler`] is a synchronous state machine: it consumes [`Event`]s
//! and returns [`Effect`]s. It never touches the DOM, the network or a clock.
//! The async [`Runtime`] executes effects through a [`Host`], runs timers on
//! tokio and feeds completions back in as events.
//!
//! ```text
//! browser events ──► Runtime ──► Reconciler::handle ──► Vec<Effect>
//!                       ▲                                   │
//!                       └──── TimerElapsed / Navigation ◄───┘ (Host)
//! ```
//!
//! Storage is injected through [`KeyValueStorage`], so every operation can be
//! exercised against [`MemoryStorage`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod decorator;
pub mod error;
pub mod event;
pub mod indicator;
pub mod lifecycle;
pub mod machine;
pub mod navigation;
pub mod reconciler;
pub mod runtime;
pub mod scroll;
pub mod store;
pub mod swap;

pub use config::{ConfigError, ReconcilerConfig};
pub use decorator::decorate;
pub use error::{HostError, StorageError};
pub use event::{
    ClientEvent, Effect, Event, NavigationIntent, NavigationMode, NotificationId,
    OutboundRequest, ResponseInfo, TimerId,
};
pub use machine::{AuthPhase, Transition};
pub use navigation::{Gate, Navigator};
pub use reconciler::Reconciler;
pub use runtime::{Host, Runtime};
pub use scroll::ScrollMemory;
pub use store::{KeyValueStorage, MemoryStorage, SessionStore};
