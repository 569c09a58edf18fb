// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle and capability contracts for deployable units.
//!
//! The deployer only ever sees [`Eventrix`]. Concrete units implement one of the
//! two capabilities, [`Emitter`] or [`Handler`], and are wrapped by the matching
//! adapter in [`crate::engine`] which supplies the lifecycle.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::errors::UnitError;
use crate::traits::pilot::{MessageCallback, Payload};

/// Lifecycle of a single deployment.
///
/// `Pending -> Running -> Stopped`, with `Failed` reachable from `Pending`
/// (construction or start failure) and from `Running` (stop failure). There is
/// no way back to `Running`; a fresh deploy is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Pending,
    Running,
    Stopped,
    Failed,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Failed) | (Running, Stopped) | (Running, Failed)
        )
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub fn advance(&mut self, next: LifecycleState) -> bool {
        let legal = self.can_transition_to(next);
        if legal {
            *self = next;
        }
        legal
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Self-reported status of a unit. `details` is free-form and unit-defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitStatus {
    pub state: LifecycleState,
    pub details: serde_json::Value,
}

impl UnitStatus {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            state,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }
}

/// Uniform lifecycle of a deployable unit.
#[async_trait]
pub trait Eventrix: Send + Sync {
    async fn start(&self) -> Result<(), UnitError>;

    /// Release everything acquired by `start`. Safe to call on a unit whose
    /// start failed part-way.
    async fn stop(&self) -> Result<(), UnitError>;

    fn status(&self) -> UnitStatus;

    fn type_name(&self) -> &'static str;
}

/// Lazily produces an unbounded sequence of outbound payloads.
pub type Generator = Box<dyn Fn() -> BoxStream<'static, Result<Payload, UnitError>> + Send + Sync>;

/// Capability of units that publish messages sourced from an external feed.
#[async_trait]
pub trait Emitter: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Acquire the external feed. Called before generators are requested, and
    /// again after every feed failure.
    async fn on_start(&self) -> Result<(), UnitError> {
        Ok(())
    }

    /// Release the external feed. Always called once the pump stops using it.
    async fn on_finish(&self) {}

    /// Subject -> generator pairs. Requested again after every reconnect.
    fn get_generators(&self) -> Vec<(String, Generator)>;

    fn details(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Capability of units that react to inbound messages.
pub trait Handler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Subject -> callback pairs to subscribe on start.
    fn get_handlers(self: Arc<Self>) -> Vec<(String, MessageCallback)>;

    fn details(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
