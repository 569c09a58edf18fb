// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle adapter that turns an [`Emitter`] into a deployable unit.
//!
//! # Pump loop
//!
//! ```text
//! on_start ─► get_generators ─► merge streams ─► publish each item
//!    ▲                                              │
//!    │            feed error / publish error /      │
//!    └── backoff ◄── on_finish ◄── stream ended ◄───┘
//!
//! stop request at any point ─► on_finish ─► exit
//! ```
//!
//! All generator streams of one emitter are merged into a single pump task, so
//! items of one subject are published in the order the generator yields them.
//! A transient feed failure never ends the pump; only a stop request does.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::consts::{DEFAULT_RECONNECT_DELAY, EMITTER_STOP_GRACE};
use crate::errors::UnitError;
use crate::observability::messages::unit::{
    FeedConnected, FeedInterrupted, FeedReconnectFailed, PumpAborted, PumpStopped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Emitter, Eventrix, LifecycleState, Payload, Pilot, UnitStatus};

/// Timing knobs for the pump loop.
#[derive(Debug, Clone, Copy)]
pub struct EmitterOptions {
    /// Delay between a feed failure and the next `on_start` attempt.
    pub reconnect_delay: Duration,
    /// How long `stop` waits for the pump before aborting it.
    pub stop_grace: Duration,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            stop_grace: EMITTER_STOP_GRACE,
        }
    }
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    reconnects: AtomicU64,
}

struct PumpState {
    lifecycle: LifecycleState,
    /// Set while a `start` call owns the unit, so a second caller is refused.
    starting: bool,
    cancel: Option<CancellationToken>,
    pump: Option<JoinHandle<()>>,
}

/// Deployable unit backed by an [`Emitter`].
pub struct EmitterUnit<E: Emitter> {
    emitter: Arc<E>,
    pilot: Arc<dyn Pilot>,
    options: EmitterOptions,
    counters: Arc<Counters>,
    state: Mutex<PumpState>,
}

impl<E: Emitter> EmitterUnit<E> {
    pub fn new(emitter: E, pilot: Arc<dyn Pilot>) -> Self {
        Self::with_options(emitter, pilot, EmitterOptions::default())
    }

    pub fn with_options(emitter: E, pilot: Arc<dyn Pilot>, options: EmitterOptions) -> Self {
        Self {
            emitter: Arc::new(emitter),
            pilot,
            options,
            counters: Arc::new(Counters::default()),
            state: Mutex::new(PumpState {
                lifecycle: LifecycleState::Pending,
                starting: false,
                cancel: None,
                pump: None,
            }),
        }
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn published(&self) -> u64 {
        self.counters.published.load(Ordering::Relaxed)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PumpState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<E: Emitter> Eventrix for EmitterUnit<E> {
    async fn start(&self) -> Result<(), UnitError> {
        {
            let mut state = self.lock_state();
            if state.lifecycle != LifecycleState::Pending || state.starting {
                return Err(UnitError::Other(format!(
                    "emitter '{}' can only be started once",
                    self.emitter.name()
                )));
            }
            state.starting = true;
        }

        if let Err(e) = self.emitter.on_start().await {
            let mut state = self.lock_state();
            state.starting = false;
            state.lifecycle.advance(LifecycleState::Failed);
            return Err(e);
        }

        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(
            Arc::clone(&self.emitter),
            Arc::clone(&self.pilot),
            cancel.clone(),
            self.options,
            Arc::clone(&self.counters),
        ));

        let mut state = self.lock_state();
        state.starting = false;
        state.cancel = Some(cancel);
        state.pump = Some(pump);
        state.lifecycle.advance(LifecycleState::Running);
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        let (cancel, pump) = {
            let mut state = self.lock_state();
            (state.cancel.take(), state.pump.take())
        };

        let (Some(cancel), Some(mut pump)) = (cancel, pump) else {
            // Never started, or start failed before the pump existed.
            return Ok(());
        };

        cancel.cancel();
        if tokio::time::timeout(self.options.stop_grace, &mut pump)
            .await
            .is_err()
        {
            pump.abort();
            PumpAborted {
                unit: self.emitter.name(),
                grace: self.options.stop_grace,
            }
            .log();
            // The aborted pump never reached its own on_finish.
            self.emitter.on_finish().await;
        }

        self.lock_state().lifecycle.advance(LifecycleState::Stopped);
        Ok(())
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::new(self.lock_state().lifecycle).with_details(serde_json::json!({
            "published": self.counters.published.load(Ordering::Relaxed),
            "reconnects": self.counters.reconnects.load(Ordering::Relaxed),
            "emitter": self.emitter.details(),
        }))
    }

    fn type_name(&self) -> &'static str {
        self.emitter.name()
    }
}

type Tagged = (Arc<str>, Result<Payload, UnitError>);

fn merged_stream<E: Emitter>(emitter: &E) -> (usize, BoxStream<'static, Tagged>) {
    let streams: Vec<BoxStream<'static, Tagged>> = emitter
        .get_generators()
        .into_iter()
        .map(|(subject, generator)| {
            let subject: Arc<str> = Arc::from(subject);
            generator()
                .map(move |item| (Arc::clone(&subject), item))
                .boxed()
        })
        .collect();

    let count = streams.len();
    if count == 0 {
        // Nothing to pump; park until stopped.
        (0, stream::pending().boxed())
    } else {
        (count, stream::select_all(streams).boxed())
    }
}

async fn run_pump<E: Emitter>(
    emitter: Arc<E>,
    pilot: Arc<dyn Pilot>,
    cancel: CancellationToken,
    options: EmitterOptions,
    counters: Arc<Counters>,
) {
    let mut attempt: u64 = 1;

    'session: loop {
        let (subject_count, mut items) = merged_stream(emitter.as_ref());
        FeedConnected {
            unit: emitter.name(),
            attempt,
            subject_count,
        }
        .log();

        let (subject, reason) = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'session,
                next = items.next() => match next {
                    Some((subject, Ok(payload))) => {
                        if let Err(e) = pilot.publish(&subject, payload).await {
                            break (subject, e.to_string());
                        }
                        counters.published.fetch_add(1, Ordering::Relaxed);
                    }
                    Some((subject, Err(e))) => break (subject, e.to_string()),
                    None => break (Arc::from("*"), "feed ended".to_string()),
                },
            }
        };

        // Tear the feed down before trying to bring it back.
        drop(items);
        emitter.on_finish().await;
        FeedInterrupted {
            unit: emitter.name(),
            subject: &subject,
            reason: &reason,
            retry_in: options.reconnect_delay,
        }
        .log();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    PumpStopped { unit: emitter.name(), published: counters.published.load(Ordering::Relaxed) }.log();
                    return;
                }
                _ = tokio::time::sleep(options.reconnect_delay) => {}
            }

            attempt += 1;
            counters.reconnects.fetch_add(1, Ordering::Relaxed);
            match emitter.on_start().await {
                Ok(()) => continue 'session,
                Err(e) => FeedReconnectFailed {
                    unit: emitter.name(),
                    attempt,
                    error: &e,
                }
                .log(),
            }
        }
    }

    emitter.on_finish().await;
    PumpStopped {
        unit: emitter.name(),
        published: counters.published.load(Ordering::Relaxed),
    }
    .log();
}
