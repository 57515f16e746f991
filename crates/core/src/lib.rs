//! Secondhand Core - Shared types library.
//!
//! This crate provides the types shared by the storefront server and the
//! client-side session reconciler:
//! - `session` - Token lifecycle, navigation and UI reconciliation
//! - `cli` - Developer tooling (token inspection, event replay)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no storage, no
//! timers, no HTTP clients. The optional `axum` feature adds server-side
//! emission of trigger headers.
//!
//! # Modules
//!
//! - [`types`] - Session tokens, guest cart ids, notifications, trigger wire
//!   format and the route table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
