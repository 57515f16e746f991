//! Core types for the Secondhand storefront.
//!
//! This module provides type-safe wrappers for the values that cross the
//! server/client boundary.

pub mod cart;
pub mod notification;
pub mod routes;
pub mod token;
pub mod trigger;

pub use cart::{CartSnapshot, GuestCartId, GuestCartIdError};
pub use notification::{Notification, NotificationKind};
pub use routes::{Routes, path_only};
pub use token::{SessionToken, TokenClaims, TokenError};
pub use trigger::{
    AuthSource, HX_TRIGGER, ServerEvent, TriggerBatch, TriggerError, TriggerSet,
    parse_trigger_header,
};
