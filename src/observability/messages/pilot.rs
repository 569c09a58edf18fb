// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pilot (transport) events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Pilot connected.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PilotConnected<'a> {
    pub pilot: &'a str,
    pub endpoint: &'a str,
}

impl Display for PilotConnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pilot '{}' connected to {}", self.pilot, self.endpoint)
    }
}

impl StructuredLog for PilotConnected<'_> {
    fn log(&self) {
        tracing::info!(pilot = self.pilot, endpoint = self.endpoint, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pilot", span_name = name, pilot = self.pilot)
    }
}

/// Pilot disconnected and dropped its remaining subscriptions.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PilotDisconnected<'a> {
    pub pilot: &'a str,
    pub dropped_subscriptions: usize,
}

impl Display for PilotDisconnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pilot '{}' disconnected, dropped {} subscription(s)",
            self.pilot, self.dropped_subscriptions
        )
    }
}

impl StructuredLog for PilotDisconnected<'_> {
    fn log(&self) {
        tracing::info!(
            pilot = self.pilot,
            dropped_subscriptions = self.dropped_subscriptions,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pilot_disconnected", span_name = name, pilot = self.pilot)
    }
}

/// A subscription was opened or closed.
///
/// # Log Level
/// `debug!` - Routine detail
pub struct SubscriptionChanged<'a> {
    pub pilot: &'a str,
    pub subject: &'a str,
    pub subscription_id: u64,
    pub opened: bool,
}

impl Display for SubscriptionChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let verb = if self.opened { "opened" } else { "closed" };
        write!(
            f,
            "Pilot '{}' {} subscription {} on '{}'",
            self.pilot, verb, self.subscription_id, self.subject
        )
    }
}

impl StructuredLog for SubscriptionChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            pilot = self.pilot,
            subject = self.subject,
            subscription_id = self.subscription_id,
            opened = self.opened,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subscription",
            span_name = name,
            subject = self.subject,
            subscription_id = self.subscription_id,
        )
    }
}

/// The broker closed a subscription's message stream without being asked to.
///
/// # Log Level
/// `warn!` - Delivery on this subject has stopped
pub struct SubscriptionStreamEnded<'a> {
    pub pilot: &'a str,
    pub subject: &'a str,
}

impl Display for SubscriptionStreamEnded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pilot '{}' lost its message stream for '{}'",
            self.pilot, self.subject
        )
    }
}

impl StructuredLog for SubscriptionStreamEnded<'_> {
    fn log(&self) {
        tracing::warn!(pilot = self.pilot, subject = self.subject, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("subscription_stream_ended", span_name = name, subject = self.subject)
    }
}
