// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::UnitError;
use crate::traits::{Eventrix, LifecycleState, UnitStatus};

/// Tracks its own lifecycle and does nothing else.
pub struct StubUnit {
    state: Mutex<LifecycleState>,
    instance: u64,
}

impl StubUnit {
    pub fn new() -> Self {
        Self::with_instance(0)
    }

    pub fn with_instance(instance: u64) -> Self {
        Self {
            state: Mutex::new(LifecycleState::Pending),
            instance,
        }
    }

    fn set(&self, next: LifecycleState) {
        *self.state.lock().unwrap() = next;
    }
}

#[async_trait]
impl Eventrix for StubUnit {
    async fn start(&self) -> Result<(), UnitError> {
        self.set(LifecycleState::Running);
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        self.set(LifecycleState::Stopped);
        Ok(())
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(*self.state.lock().unwrap())
            .with_details(serde_json::json!({ "instance": self.instance }))
    }

    fn type_name(&self) -> &'static str {
        "stub"
    }
}

/// How a unit's `stop` behaves.
#[derive(Clone, Copy)]
pub enum StopOutcome {
    Succeeds,
    Fails,
    Hangs,
}

impl StopOutcome {
    async fn run(self) -> Result<(), UnitError> {
        match self {
            StopOutcome::Succeeds => Ok(()),
            StopOutcome::Fails => Err(UnitError::Other("simulated stop failure".to_string())),
            StopOutcome::Hangs => std::future::pending().await,
        }
    }
}

/// A unit whose start always fails. Counts the cleanup stops it receives.
pub struct FailingStartUnit {
    stopped: Arc<AtomicU64>,
    cleanup: StopOutcome,
}

impl FailingStartUnit {
    pub fn new() -> Self {
        Self::with_cleanup(Arc::default(), StopOutcome::Succeeds)
    }

    pub fn with_cleanup(stopped: Arc<AtomicU64>, cleanup: StopOutcome) -> Self {
        Self { stopped, cleanup }
    }
}

#[async_trait]
impl Eventrix for FailingStartUnit {
    async fn start(&self) -> Result<(), UnitError> {
        Err(UnitError::Feed("simulated start failure".to_string()))
    }

    async fn stop(&self) -> Result<(), UnitError> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        self.cleanup.run().await
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(LifecycleState::Failed)
    }

    fn type_name(&self) -> &'static str {
        "failing_start"
    }
}

/// A unit whose start takes `delay` to succeed.
pub struct SlowStartUnit {
    delay: Duration,
    stop: StopOutcome,
}

impl SlowStartUnit {
    pub fn new(delay: Duration, stop: StopOutcome) -> Self {
        Self { delay, stop }
    }
}

#[async_trait]
impl Eventrix for SlowStartUnit {
    async fn start(&self) -> Result<(), UnitError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        self.stop.run().await
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(LifecycleState::Running)
    }

    fn type_name(&self) -> &'static str {
        "slow_start"
    }
}

/// A unit that starts but refuses to stop cleanly
pub struct FailingStopUnit;

impl FailingStopUnit {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Eventrix for FailingStopUnit {
    async fn start(&self) -> Result<(), UnitError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        StopOutcome::Fails.run().await
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(LifecycleState::Running)
    }

    fn type_name(&self) -> &'static str {
        "failing_stop"
    }
}

/// A unit whose stop never completes
pub struct HangingStopUnit;

impl HangingStopUnit {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Eventrix for HangingStopUnit {
    async fn start(&self) -> Result<(), UnitError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        StopOutcome::Hangs.run().await
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(LifecycleState::Running)
    }

    fn type_name(&self) -> &'static str {
        "hanging_stop"
    }
}

/// Hands out [`StubUnit`]s numbered in construction order.
#[derive(Clone, Default)]
pub struct InstanceCounter {
    next: Arc<AtomicU64>,
}

impl InstanceCounter {
    pub fn next_unit(&self) -> StubUnit {
        StubUnit::with_instance(self.next.fetch_add(1, Ordering::SeqCst))
    }

    pub fn created(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
