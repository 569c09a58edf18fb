// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for deployer and registry events.
//!
//! This module contains message types for logging events related to:
//! * Unit type registration
//! * Deploy and undeploy lifecycle (requested, running, failed, removed)
//! * Shutdown fan-out and its aggregate outcome

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A unit type was added to the registry.
///
/// # Log Level
/// `debug!` - Startup detail
pub struct UnitTypeRegistered<'a> {
    pub name: &'a str,
}

impl Display for UnitTypeRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Registered unit type '{}'", self.name)
    }
}

impl StructuredLog for UnitTypeRegistered<'_> {
    fn log(&self) {
        tracing::debug!(unit_type = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("unit_type_registered", span_name = name, unit_type = self.name)
    }
}

/// A unit type name was registered again and the previous constructor replaced.
///
/// # Log Level
/// `warn!` - Expected during development hot reload, suspicious otherwise
///
/// # Example
/// ```
/// use eventrix::observability::messages::deployer::UnitTypeOverwritten;
///
/// let msg = UnitTypeOverwritten { name: "price_alert" };
/// assert_eq!(
///     msg.to_string(),
///     "Unit type 'price_alert' was already registered; replacing its constructor"
/// );
/// ```
pub struct UnitTypeOverwritten<'a> {
    pub name: &'a str,
}

impl Display for UnitTypeOverwritten<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit type '{}' was already registered; replacing its constructor",
            self.name
        )
    }
}

impl StructuredLog for UnitTypeOverwritten<'_> {
    fn log(&self) {
        tracing::warn!(unit_type = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unit_type_overwritten", span_name = name, unit_type = self.name)
    }
}

/// A deploy request was accepted and the unit is being constructed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DeploymentRequested<'a> {
    pub id: &'a str,
    pub type_name: &'a str,
    pub option_count: usize,
}

impl Display for DeploymentRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Deploying '{}' as '{}' with {} option(s)",
            self.id, self.type_name, self.option_count
        )
    }
}

impl StructuredLog for DeploymentRequested<'_> {
    fn log(&self) {
        tracing::info!(
            deployment_id = self.id,
            unit_type = self.type_name,
            option_count = self.option_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "deployment",
            span_name = name,
            deployment_id = self.id,
            unit_type = self.type_name,
        )
    }
}

/// A unit started and was recorded as running.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DeploymentRunning<'a> {
    pub id: &'a str,
    pub type_name: &'a str,
    pub duration: Duration,
}

impl Display for DeploymentRunning<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Deployment '{}' ({}) is running, started in {:?}",
            self.id, self.type_name, self.duration
        )
    }
}

impl StructuredLog for DeploymentRunning<'_> {
    fn log(&self) {
        tracing::info!(
            deployment_id = self.id,
            unit_type = self.type_name,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "deployment_running",
            span_name = name,
            deployment_id = self.id,
            unit_type = self.type_name,
        )
    }
}

/// A deploy request failed: rejected up front, or construction/start failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DeploymentFailed<'a> {
    pub id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for DeploymentFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Deployment '{}' failed: {}", self.id, self.error)
    }
}

impl StructuredLog for DeploymentFailed<'_> {
    fn log(&self) {
        tracing::error!(deployment_id = self.id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "deployment_failed",
            span_name = name,
            deployment_id = self.id,
            error = %self.error,
        )
    }
}

/// Best-effort stop after a failed start did not succeed either.
///
/// # Log Level
/// `warn!` - The original start error is what the caller sees
pub struct StartCleanupFailed<'a> {
    pub id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StartCleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cleanup of deployment '{}' after failed start also failed: {}",
            self.id, self.error
        )
    }
}

impl StructuredLog for StartCleanupFailed<'_> {
    fn log(&self) {
        tracing::warn!(deployment_id = self.id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "start_cleanup_failed",
            span_name = name,
            deployment_id = self.id,
        )
    }
}

/// A deployment was removed and its unit stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DeploymentStopped<'a> {
    pub id: &'a str,
    pub duration: Duration,
}

impl Display for DeploymentStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Deployment '{}' stopped in {:?}", self.id, self.duration)
    }
}

impl StructuredLog for DeploymentStopped<'_> {
    fn log(&self) {
        tracing::info!(
            deployment_id = self.id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("deployment_stopped", span_name = name, deployment_id = self.id)
    }
}

/// A unit's stop failed or timed out. The deployment is removed regardless.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DeploymentStopFailed<'a> {
    pub id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for DeploymentStopFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Deployment '{}' failed to stop cleanly and was removed: {}",
            self.id, self.error
        )
    }
}

impl StructuredLog for DeploymentStopFailed<'_> {
    fn log(&self) {
        tracing::error!(deployment_id = self.id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "deployment_stop_failed",
            span_name = name,
            deployment_id = self.id,
            error = %self.error,
        )
    }
}

/// Shutdown began.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ShutdownStarted {
    pub deployment_count: usize,
    pub background_tasks: usize,
}

impl Display for ShutdownStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Shutting down: stopping {} deployment(s), {} background task(s) outstanding",
            self.deployment_count, self.background_tasks
        )
    }
}

impl StructuredLog for ShutdownStarted {
    fn log(&self) {
        tracing::info!(
            deployment_count = self.deployment_count,
            background_tasks = self.background_tasks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "shutdown",
            span_name = name,
            deployment_count = self.deployment_count,
        )
    }
}

/// Shutdown finished.
///
/// # Log Level
/// `info!` when every unit stopped, `warn!` otherwise
pub struct ShutdownCompleted {
    pub stopped: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for ShutdownCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Shutdown complete in {:?}: {} stopped, {} failed",
            self.duration, self.stopped, self.failed
        )
    }
}

impl StructuredLog for ShutdownCompleted {
    fn log(&self) {
        if self.failed == 0 {
            tracing::info!(
                stopped = self.stopped,
                failed = self.failed,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                stopped = self.stopped,
                failed = self.failed,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "shutdown_completed",
            span_name = name,
            stopped = self.stopped,
            failed = self.failed,
        )
    }
}
