//! Error types for registration and traversal.
//!
//! Each subsystem owns its error enum (`SelectorError` lives with the
//! compiler, `ListenerFailure` with the emitter); this module adds the
//! run-time error type and a unified crate error that bridges both for
//! embedding callers.
//!
//! ## Propagation policy
//!
//! - Syntax and category errors fail `Engine::on` immediately and
//!   atomically; a malformed selector is never partially registered and
//!   never reaches traversal time.
//! - Listener errors are never swallowed: under `FailurePolicy::Abort` the
//!   first failure stops the pass, under `FailurePolicy::Continue` every
//!   failure is collected and surfaced when the run returns.

use thiserror::Error;

pub use crate::emitter::{ListenerError, ListenerFailure};
pub use crate::selector::SelectorError;

/// Errors that can occur while running a traversal session.
#[derive(Debug, Error)]
pub enum RunError {
    /// The supplied root value is not a node.
    #[error("root value is not a node: expected an object with a string '{field}' field")]
    InvalidRoot { field: String },

    /// A listener failed and the failure policy is `Abort`.
    #[error("listener for '{selector}' failed: {error}")]
    Listener { selector: String, error: ListenerError },

    /// One or more listeners failed under `FailurePolicy::Continue`; the
    /// traversal ran to completion before reporting.
    #[error("{} listener(s) failed during traversal", .failures.len())]
    Listeners { failures: Vec<ListenerFailure> },
}

/// Unified error type for callers that register and run through one
/// surface.
#[derive(Debug, Error)]
pub enum SiftError {
    /// Selector compilation failed at registration time.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A traversal run failed.
    #[error(transparent)]
    Run(#[from] RunError),
}
