// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Owner of every running unit.
//!
//! # Invariants
//! - At most one live or in-flight deployment per ID. An ID is reserved before
//!   construction and only enters the live map once `start` has succeeded.
//! - The state mutex is never held across an `.await`.
//! - Undeploy removes the record before stopping the unit, so the ID is free
//!   again even when the stop fails or times out.
//! - Once shutdown begins no deployment can become live, and shutdown does
//!   not return while a deploy is still in flight.

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::consts::{DEFAULT_FINISHED_RETENTION, DEFAULT_STOP_TIMEOUT};
use crate::config::{DeployerSettings, UnitConfig, UnitContext, UnitRegistry};
use crate::errors::{DeployError, StopFailure, UnitError};
use crate::observability::messages::deployer::{
    DeploymentFailed, DeploymentRequested, DeploymentRunning, DeploymentStopFailed,
    DeploymentStopped, ShutdownCompleted, ShutdownStarted, StartCleanupFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Eventrix, LifecycleState, Pilot, UnitStatus};

/// Deployer tuning.
#[derive(Debug, Clone, Copy)]
pub struct DeployerOptions {
    /// Upper bound on a single unit's `stop`.
    pub stop_timeout: Duration,
    /// How many finished deployments [`Deployer::lifecycle`] remembers.
    pub finished_retention: usize,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            finished_retention: DEFAULT_FINISHED_RETENTION,
        }
    }
}

impl From<&DeployerSettings> for DeployerOptions {
    fn from(settings: &DeployerSettings) -> Self {
        Self {
            stop_timeout: settings.stop_timeout(),
            finished_retention: settings.finished_retention(),
        }
    }
}

/// Snapshot row returned by [`Deployer::get_all_deployments`].
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentInfo {
    pub id: String,
    pub type_name: String,
    pub status: UnitStatus,
    pub config: serde_json::Value,
}

struct Deployment {
    unit: Arc<dyn Eventrix>,
    type_name: String,
    config: UnitConfig,
}

/// Terminal state of deployments that have left the live map. Oldest entries
/// are evicted once `capacity` is exceeded.
struct FinishedLog {
    states: HashMap<String, LifecycleState>,
    order: VecDeque<String>,
    capacity: usize,
}

impl FinishedLog {
    fn new(capacity: usize) -> Self {
        Self {
            states: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, id: &str) -> Option<LifecycleState> {
        self.states.get(id).copied()
    }

    fn insert(&mut self, id: &str, state: LifecycleState) {
        if self.states.insert(id.to_string(), state).is_none() {
            self.order.push_back(id.to_string());
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, id: &str) {
        if self.states.remove(id).is_some() {
            self.order.retain(|entry| entry != id);
        }
    }
}

struct DeployerState {
    live: HashMap<String, Deployment>,
    reserved: HashSet<String>,
    finished: FinishedLog,
    /// Stop failures of deploys that finished starting after shutdown began.
    late_failures: Vec<StopFailure>,
    shutting_down: bool,
}

/// Releases an in-flight ID reservation when the deploy call ends, whether it
/// returns or its future is dropped.
struct Reservation<'a> {
    deployer: &'a Deployer,
    id: &'a str,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.deployer.lock_state().reserved.remove(self.id);
    }
}

/// Manages the concurrent lifecycle of units keyed by deployment ID.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use eventrix::backends::memory::InMemoryPilot;
/// use eventrix::config::{UnitConfig, UnitRegistry};
/// use eventrix::engine::Deployer;
/// use eventrix::traits::Pilot;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pilot = Arc::new(InMemoryPilot::new());
/// pilot.connect().await.unwrap();
///
/// let deployer = Deployer::new(Arc::new(UnitRegistry::with_builtin_units()), pilot);
/// let config = UnitConfig::new().with("subjects", vec!["alerts:BTCUSDT"]);
/// deployer.deploy("logger", "message_logger", config).await.unwrap();
///
/// assert!(deployer.is_deployed("logger"));
/// deployer.shutdown().await.unwrap();
/// assert_eq!(deployer.len(), 0);
/// # }
/// ```
pub struct Deployer {
    registry: Arc<UnitRegistry>,
    pilot: Arc<dyn Pilot>,
    options: DeployerOptions,
    state: Mutex<DeployerState>,
    /// Detached stops.
    tasks: TaskTracker,
    /// Deploy calls in flight.
    deploys: TaskTracker,
    cancel: CancellationToken,
}

impl Deployer {
    pub fn new(registry: Arc<UnitRegistry>, pilot: Arc<dyn Pilot>) -> Self {
        Self::with_options(registry, pilot, DeployerOptions::default())
    }

    pub fn with_options(
        registry: Arc<UnitRegistry>,
        pilot: Arc<dyn Pilot>,
        options: DeployerOptions,
    ) -> Self {
        Self {
            registry,
            pilot,
            options,
            state: Mutex::new(DeployerState {
                live: HashMap::new(),
                reserved: HashSet::new(),
                finished: FinishedLog::new(options.finished_retention),
                late_failures: Vec::new(),
                shutting_down: false,
            }),
            tasks: TaskTracker::new(),
            deploys: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Construct a unit of `type_name`, start it and make it live under `id`.
    ///
    /// The ID is only visible in the live set after `start` succeeded. While
    /// the deploy is in flight the ID is reserved, so a concurrent deploy of
    /// the same ID fails with `AlreadyDeployed`.
    pub async fn deploy(
        &self,
        id: &str,
        type_name: &str,
        config: UnitConfig,
    ) -> Result<(), DeployError> {
        let started = Instant::now();
        let result = self
            .deploys
            .track_future(self.try_deploy(id, type_name, config))
            .await;

        match &result {
            Ok(()) => DeploymentRunning {
                id,
                type_name,
                duration: started.elapsed(),
            }
            .log(),
            Err(e) => DeploymentFailed { id, error: e }.log(),
        }
        result
    }

    async fn try_deploy(
        &self,
        id: &str,
        type_name: &str,
        config: UnitConfig,
    ) -> Result<(), DeployError> {
        let constructor = {
            let mut state = self.lock_state();
            if state.shutting_down {
                return Err(DeployError::ShuttingDown(id.to_string()));
            }
            if state.live.contains_key(id) || state.reserved.contains(id) {
                return Err(DeployError::AlreadyDeployed(id.to_string()));
            }
            let constructor = self
                .registry
                .get(type_name)
                .ok_or_else(|| DeployError::UnknownType(type_name.to_string()))?;
            state.reserved.insert(id.to_string());
            state.finished.remove(id);
            constructor
        };
        let _reservation = Reservation { deployer: self, id };

        DeploymentRequested {
            id,
            type_name,
            option_count: config.len(),
        }
        .log();

        let context = UnitContext {
            id: id.to_string(),
            pilot: Arc::clone(&self.pilot),
            config: config.clone(),
        };
        let unit = constructor(context).map_err(|source| DeployError::ConstructionError {
            id: id.to_string(),
            type_name: type_name.to_string(),
            source,
        })?;

        let start = tokio::select! {
            result = unit.start() => result,
            _ = self.cancel.cancelled() => Err(UnitError::Other(
                "start abandoned at shutdown".to_string(),
            )),
        };
        if let Err(source) = start {
            // Release whatever the unit acquired before it failed.
            if let Err(cleanup) = stop_unit(&unit, self.options.stop_timeout).await {
                StartCleanupFailed { id, error: &cleanup }.log();
            }
            self.lock_state()
                .finished
                .insert(id, LifecycleState::Failed);
            return Err(DeployError::StartError {
                id: id.to_string(),
                source,
            });
        }

        let inserted = {
            let mut state = self.lock_state();
            if state.shutting_down {
                false
            } else {
                state.live.insert(
                    id.to_string(),
                    Deployment {
                        unit: Arc::clone(&unit),
                        type_name: type_name.to_string(),
                        config,
                    },
                );
                true
            }
        };

        if !inserted {
            // Shutdown began while this unit was starting; it owns the stop outcome.
            let result = stop_unit(&unit, self.options.stop_timeout).await;
            let mut state = self.lock_state();
            match result {
                Ok(()) => state.finished.insert(id, LifecycleState::Stopped),
                Err(e) => {
                    DeploymentStopFailed { id, error: &e }.log();
                    state.finished.insert(id, LifecycleState::Failed);
                    state.late_failures.push(StopFailure {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            return Err(DeployError::ShuttingDown(id.to_string()));
        }
        Ok(())
    }

    /// Remove `id` from the live set and stop its unit.
    ///
    /// The ID is free as soon as this is called; a failing or hanging stop is
    /// reported as `StopError` but never keeps the record alive.
    pub async fn undeploy(&self, id: &str) -> Result<(), DeployError> {
        let deployment = self.take_live(id)?;
        let started = Instant::now();

        let result = stop_unit(&deployment.unit, self.options.stop_timeout).await;
        self.record_finished(id, &result);
        match result {
            Ok(()) => {
                DeploymentStopped {
                    id,
                    duration: started.elapsed(),
                }
                .log();
                Ok(())
            }
            Err(source) => {
                DeploymentStopFailed { id, error: &source }.log();
                Err(DeployError::StopError {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Like [`Deployer::undeploy`], but the stop runs as a tracked background
    /// task. `shutdown` waits for it.
    pub fn undeploy_detached(self: &Arc<Self>, id: &str) -> Result<(), DeployError> {
        let deployment = self.take_live(id)?;
        let deployer = Arc::clone(self);
        let id = id.to_string();
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            let started = Instant::now();
            let result = tokio::select! {
                result = stop_unit(&deployment.unit, deployer.options.stop_timeout) => result,
                _ = cancel.cancelled() => Err(UnitError::Other(
                    "stop abandoned at shutdown".to_string(),
                )),
            };
            deployer.record_finished(&id, &result);
            match result {
                Ok(()) => DeploymentStopped {
                    id: &id,
                    duration: started.elapsed(),
                }
                .log(),
                Err(e) => DeploymentStopFailed { id: &id, error: &e }.log(),
            }
        });
        Ok(())
    }

    pub fn get_status(&self, id: &str) -> Result<UnitStatus, DeployError> {
        let unit = self
            .lock_state()
            .live
            .get(id)
            .map(|d| Arc::clone(&d.unit))
            .ok_or_else(|| DeployError::NotDeployed(id.to_string()))?;
        Ok(unit.status())
    }

    /// Snapshot of every live deployment, sorted by ID.
    pub fn get_all_deployments(&self) -> Vec<DeploymentInfo> {
        let rows: Vec<(String, String, serde_json::Value, Arc<dyn Eventrix>)> = self
            .lock_state()
            .live
            .iter()
            .map(|(id, d)| {
                (
                    id.clone(),
                    d.type_name.clone(),
                    d.config.to_json(),
                    Arc::clone(&d.unit),
                )
            })
            .collect();

        // Unit status is queried outside the lock.
        let mut infos: Vec<DeploymentInfo> = rows
            .into_iter()
            .map(|(id, type_name, config, unit)| DeploymentInfo {
                id,
                type_name,
                status: unit.status(),
                config,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Where `id` is in its lifecycle: `Pending` while in flight, `Running`
    /// while live, and the terminal state of its most recent deployment after
    /// it left the live set.
    pub fn lifecycle(&self, id: &str) -> Option<LifecycleState> {
        let state = self.lock_state();
        if state.live.contains_key(id) {
            Some(LifecycleState::Running)
        } else if state.reserved.contains(id) {
            Some(LifecycleState::Pending)
        } else {
            state.finished.get(id)
        }
    }

    pub fn is_deployed(&self, id: &str) -> bool {
        self.lock_state().live.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock_state().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().live.is_empty()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock_state().shutting_down
    }

    /// Stop every live unit concurrently and refuse further deploys.
    ///
    /// Every unit leaves the live set whatever its stop outcome. Failures are
    /// collected into `ShutdownPartialFailure`. Calling this again is a no-op.
    pub async fn shutdown(&self) -> Result<(), DeployError> {
        let started = Instant::now();
        let drained: Vec<(String, Deployment)> = {
            let mut state = self.lock_state();
            state.shutting_down = true;
            state.live.drain().collect()
        };

        ShutdownStarted {
            deployment_count: drained.len(),
            background_tasks: self.tasks.len(),
        }
        .log();

        let stop_timeout = self.options.stop_timeout;
        let outcomes = join_all(drained.into_iter().map(|(id, deployment)| async move {
            let result = stop_unit(&deployment.unit, stop_timeout).await;
            (id, result)
        }))
        .await;

        // Detached stops and in-flight deploys get one stop timeout to finish
        // on their own before they are cancelled.
        self.tasks.close();
        self.deploys.close();
        let settled = async {
            self.tasks.wait().await;
            self.deploys.wait().await;
        };
        if tokio::time::timeout(stop_timeout, settled).await.is_err() {
            self.cancel.cancel();
            self.tasks.wait().await;
            self.deploys.wait().await;
        }

        let mut failures = std::mem::take(&mut self.lock_state().late_failures);
        for (id, result) in &outcomes {
            self.record_finished(id, result);
            if let Err(e) = result {
                DeploymentStopFailed { id, error: e }.log();
                failures.push(StopFailure {
                    id: id.clone(),
                    reason: e.to_string(),
                });
            }
        }
        failures.sort_by(|a, b| a.id.cmp(&b.id));

        let stopped = outcomes.iter().filter(|(_, result)| result.is_ok()).count();
        ShutdownCompleted {
            stopped,
            failed: failures.len(),
            duration: started.elapsed(),
        }
        .log();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeployError::ShutdownPartialFailure { failures })
        }
    }

    fn take_live(&self, id: &str) -> Result<Deployment, DeployError> {
        self.lock_state()
            .live
            .remove(id)
            .ok_or_else(|| DeployError::NotDeployed(id.to_string()))
    }

    fn record_finished(&self, id: &str, result: &Result<(), UnitError>) {
        let terminal = match result {
            Ok(()) => LifecycleState::Stopped,
            Err(_) => LifecycleState::Failed,
        };
        let mut state = self.lock_state();
        // A newer deployment may already own the ID.
        if !state.live.contains_key(id) && !state.reserved.contains(id) {
            state.finished.insert(id, terminal);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DeployerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn stop_unit(unit: &Arc<dyn Eventrix>, stop_timeout: Duration) -> Result<(), UnitError> {
    match tokio::time::timeout(stop_timeout, unit.stop()).await {
        Ok(result) => result,
        Err(_) => Err(UnitError::StopTimeout(stop_timeout)),
    }
}
