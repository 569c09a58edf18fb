// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::errors::UnitError;
use crate::observability::messages::unit::{
    HandlerSubscribed, SubscriptionRollback, SubscriptionRollbackFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Eventrix, Handler, LifecycleState, Pilot, SubscriptionHandle, UnitStatus};

struct Subscriptions {
    lifecycle: LifecycleState,
    /// Set while a `start` call is subscribing.
    starting: bool,
    handles: Vec<SubscriptionHandle>,
}

/// Deployable unit backed by a [`Handler`].
///
/// `start` subscribes every `(subject, callback)` pair the handler declares.
/// If any subscribe fails, the ones already made are released before the
/// error is returned, so a failed start holds no subscriptions.
pub struct HandlerUnit<H: Handler> {
    handler: Arc<H>,
    pilot: Arc<dyn Pilot>,
    state: Mutex<Subscriptions>,
}

impl<H: Handler> HandlerUnit<H> {
    pub fn new(handler: H, pilot: Arc<dyn Pilot>) -> Self {
        Self {
            handler: Arc::new(handler),
            pilot,
            state: Mutex::new(Subscriptions {
                lifecycle: LifecycleState::Pending,
                starting: false,
                handles: Vec::new(),
            }),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn subscription_count(&self) -> usize {
        self.lock_state().handles.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Subscriptions> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn release(&self, handles: Vec<SubscriptionHandle>) -> Result<(), UnitError> {
        let mut first_error = None;
        for handle in handles {
            if let Err(e) = self.pilot.unsubscribe(handle).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<H: Handler> Eventrix for HandlerUnit<H> {
    async fn start(&self) -> Result<(), UnitError> {
        {
            let mut state = self.lock_state();
            if state.lifecycle != LifecycleState::Pending || state.starting {
                return Err(UnitError::Other(format!(
                    "handler '{}' can only be started once",
                    self.handler.name()
                )));
            }
            state.starting = true;
        }

        let pairs = Arc::clone(&self.handler).get_handlers();
        let subjects: Vec<String> = pairs.iter().map(|(subject, _)| subject.clone()).collect();
        let mut acquired = Vec::with_capacity(pairs.len());

        for (subject, callback) in pairs {
            match self.pilot.subscribe(&subject, callback).await {
                Ok(handle) => acquired.push(handle),
                Err(e) => {
                    SubscriptionRollback {
                        unit: self.handler.name(),
                        subject: &subject,
                        released: acquired.len(),
                    }
                    .log();
                    // The subscribe error is what the caller gets back.
                    if let Err(rollback) = self.release(acquired).await {
                        SubscriptionRollbackFailed {
                            unit: self.handler.name(),
                            error: &rollback,
                        }
                        .log();
                    }
                    let mut state = self.lock_state();
                    state.starting = false;
                    state.lifecycle.advance(LifecycleState::Failed);
                    return Err(e.into());
                }
            }
        }

        HandlerSubscribed {
            unit: self.handler.name(),
            subjects: &subjects,
        }
        .log();

        let mut state = self.lock_state();
        state.starting = false;
        state.handles = acquired;
        state.lifecycle.advance(LifecycleState::Running);
        Ok(())
    }

    async fn stop(&self) -> Result<(), UnitError> {
        let handles = std::mem::take(&mut self.lock_state().handles);

        let result = self.release(handles).await;
        // Only a running handler moves on; a failed or never-started one stays put.
        self.lock_state().lifecycle.advance(match result {
            Ok(()) => LifecycleState::Stopped,
            Err(_) => LifecycleState::Failed,
        });
        result
    }

    fn status(&self) -> UnitStatus {
        let state = self.lock_state();
        UnitStatus::new(state.lifecycle).with_details(serde_json::json!({
            "subscriptions": state.handles.len(),
            "handler": self.handler.details(),
        }))
    }

    fn type_name(&self) -> &'static str {
        self.handler.name()
    }
}
