//! HTTP layer for the workflow execution service.
//!
//! Thin axum surface over `wes-core`: routing, identity extraction, error
//! mapping, and per-request base-URL resolution. All job semantics live in
//! the core crate.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod state;
