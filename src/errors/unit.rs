// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by individual units during construction, start and stop.

use std::time::Duration;
use thiserror::Error;

use super::PilotError;

/// Failure reported by a unit or by one of its lifecycle adapters.
#[derive(Error, Debug)]
pub enum UnitError {
    /// A required configuration option was not supplied.
    #[error("Missing required option '{0}'")]
    MissingOption(String),

    /// A configuration option was supplied with the wrong shape.
    #[error("Invalid option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    /// The external feed behind an emitter failed.
    #[error("Feed error: {0}")]
    Feed(String),

    /// The pilot rejected a publish/subscribe/unsubscribe call.
    #[error("Pilot error: {0}")]
    Pilot(#[from] PilotError),

    /// The unit did not stop within the allotted grace period.
    #[error("Stop did not complete within {0:?}")]
    StopTimeout(Duration),

    /// Anything else a unit wants to report.
    #[error("{0}")]
    Other(String),
}

impl UnitError {
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
