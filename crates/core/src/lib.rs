//! Job-lifecycle supervisor for the workflow execution service.
//!
//! Each accepted submission forks one external workflow-engine process and
//! tracks it as a [`job::Job`]: a lock-guarded state machine with advisory
//! control signals (cancel/pause/resume), a tailing log reader, and a
//! post-completion output tree whose file references are rewritten to
//! service-addressable locations.
//!
//! This crate knows nothing about HTTP. The API layer owns routing and
//! identity extraction and consumes the types here.

pub mod access;
pub mod error;
pub mod job;
pub mod output;
pub mod registry;
pub mod spooler;

pub use error::CoreError;
