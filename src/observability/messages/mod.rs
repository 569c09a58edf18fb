// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Messages are organized by subsystem:
//!
//! * `deployer` - deploy/undeploy/shutdown and registry events
//! * `unit` - emitter pump and handler events, alert notifications
//! * `pilot` - transport connection and subscription events

use tracing::Span;

pub mod deployer;
pub mod pilot;
pub mod unit;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the event at the message's level.
    fn log(&self);

    /// Build a span carrying the same fields.
    fn span(&self, name: &str) -> Span;
}
