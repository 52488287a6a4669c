#![deny(missing_docs)]

//! Core library for the ragdesk question answering console.

/// HTTP client for the question answering API.
pub mod client;
/// Environment-driven configuration management.
pub mod config;
/// Interactive console session.
pub mod console;
/// Application context shared by the UI bindings.
pub mod context;
/// Background readiness polling.
pub mod health;
/// Structured logging and tracing setup.
pub mod logging;
/// Form state, rendering and user flows.
pub mod ui;
