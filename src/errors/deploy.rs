// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors returned by the public deployer operations.

use std::fmt;
use thiserror::Error;

use super::UnitError;

/// A single unit that failed to stop cleanly during shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct StopFailure {
    pub id: String,
    pub reason: String,
}

impl fmt::Display for StopFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.id, self.reason)
    }
}

/// Every outcome a caller of [`crate::engine::Deployer`] can observe besides success.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deployment '{0}' already exists")]
    AlreadyDeployed(String),

    #[error("Deployment '{0}' does not exist")]
    NotDeployed(String),

    #[error("Unknown unit type '{0}'")]
    UnknownType(String),

    #[error("Failed to construct '{type_name}' for deployment '{id}': {source}")]
    ConstructionError {
        id: String,
        type_name: String,
        #[source]
        source: UnitError,
    },

    #[error("Failed to start deployment '{id}': {source}")]
    StartError {
        id: String,
        #[source]
        source: UnitError,
    },

    #[error("Failed to stop deployment '{id}': {source}")]
    StopError {
        id: String,
        #[source]
        source: UnitError,
    },

    /// One or more units failed to stop during shutdown. Every unit was still
    /// removed from the live set.
    #[error("{} deployment(s) failed to stop cleanly: {}", failures.len(), join_failures(failures))]
    ShutdownPartialFailure { failures: Vec<StopFailure> },

    /// The deployer is shutting down and accepts no new deployments.
    #[error("Deployer is shutting down; deployment '{0}' rejected")]
    ShuttingDown(String),
}

fn join_failures(failures: &[StopFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_partial_failure_lists_every_unit() {
        let err = DeployError::ShutdownPartialFailure {
            failures: vec![
                StopFailure {
                    id: "feed".to_string(),
                    reason: "boom".to_string(),
                },
                StopFailure {
                    id: "alert".to_string(),
                    reason: "Stop did not complete within 1s".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("2 deployment(s) failed to stop cleanly"));
        assert!(msg.contains("'feed': boom"));
        assert!(msg.contains("'alert': Stop did not complete"));
    }

    #[test]
    fn test_construction_error_keeps_source() {
        let err = DeployError::ConstructionError {
            id: "a".to_string(),
            type_name: "price_alert".to_string(),
            source: UnitError::MissingOption("thresholds".to_string()),
        };

        assert!(err.to_string().contains("Missing required option 'thresholds'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
