//! Core routing and state for the SMS relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind
//! ports (traits) implemented in the adapter crate.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod report;
pub mod router;
pub mod store;

pub use errors::{Error, Result};
