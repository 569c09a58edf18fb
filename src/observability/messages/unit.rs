// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for events inside running units.
//!
//! This module contains message types for logging events related to:
//! * Emitter feed connection, failure and recovery
//! * Handler subscription setup and rollback
//! * Callback failures and message receipt
//! * Threshold alert notifications

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// An emitter opened its external feed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct FeedConnected<'a> {
    pub unit: &'a str,
    pub attempt: u64,
    pub subject_count: usize,
}

impl Display for FeedConnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Emitter '{}' connected to feed (attempt {}), pumping {} subject(s)",
            self.unit, self.attempt, self.subject_count
        )
    }
}

impl StructuredLog for FeedConnected<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            attempt = self.attempt,
            subject_count = self.subject_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("feed", span_name = name, unit = self.unit, attempt = self.attempt)
    }
}

/// The feed behind an emitter failed; the pump will reconnect.
///
/// # Log Level
/// `warn!` - Transient, recovered automatically
pub struct FeedInterrupted<'a> {
    pub unit: &'a str,
    pub subject: &'a str,
    pub reason: &'a str,
    pub retry_in: Duration,
}

impl Display for FeedInterrupted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Emitter '{}' lost feed on '{}': {}; reconnecting in {:?}",
            self.unit, self.subject, self.reason, self.retry_in
        )
    }
}

impl StructuredLog for FeedInterrupted<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            subject = self.subject,
            reason = self.reason,
            retry_in_ms = self.retry_in.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "feed_interrupted",
            span_name = name,
            unit = self.unit,
            subject = self.subject,
        )
    }
}

/// Re-opening the feed failed; another attempt follows after the delay.
///
/// # Log Level
/// `warn!` - Transient, retried
pub struct FeedReconnectFailed<'a> {
    pub unit: &'a str,
    pub attempt: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for FeedReconnectFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Emitter '{}' failed to reopen feed (attempt {}): {}",
            self.unit, self.attempt, self.error
        )
    }
}

impl StructuredLog for FeedReconnectFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            attempt = self.attempt,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("feed_reconnect_failed", span_name = name, unit = self.unit)
    }
}

/// The emitter pump exited after a stop request.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PumpStopped<'a> {
    pub unit: &'a str,
    pub published: u64,
}

impl Display for PumpStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Emitter '{}' stopped after publishing {} message(s)",
            self.unit, self.published
        )
    }
}

impl StructuredLog for PumpStopped<'_> {
    fn log(&self) {
        tracing::info!(unit = self.unit, published = self.published, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pump_stopped", span_name = name, unit = self.unit)
    }
}

/// The pump did not exit within its grace period and was aborted.
///
/// # Log Level
/// `warn!` - In-flight work was dropped
pub struct PumpAborted<'a> {
    pub unit: &'a str,
    pub grace: Duration,
}

impl Display for PumpAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Emitter '{}' did not stop within {:?}; pump aborted",
            self.unit, self.grace
        )
    }
}

impl StructuredLog for PumpAborted<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            grace_ms = self.grace.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("pump_aborted", span_name = name, unit = self.unit)
    }
}

/// A handler subscribed to all of its subjects.
///
/// # Log Level
/// `info!` - Important operational event
pub struct HandlerSubscribed<'a> {
    pub unit: &'a str,
    pub subjects: &'a [String],
}

impl Display for HandlerSubscribed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler '{}' subscribed to [{}]",
            self.unit,
            self.subjects.join(", ")
        )
    }
}

impl StructuredLog for HandlerSubscribed<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            subject_count = self.subjects.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("handler", span_name = name, unit = self.unit)
    }
}

/// A subscribe call failed part-way; earlier subscriptions are being released.
///
/// # Log Level
/// `warn!` - Start will fail, cleanup in progress
pub struct SubscriptionRollback<'a> {
    pub unit: &'a str,
    pub subject: &'a str,
    pub released: usize,
}

impl Display for SubscriptionRollback<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler '{}' failed to subscribe to '{}'; releasing {} earlier subscription(s)",
            self.unit, self.subject, self.released
        )
    }
}

impl StructuredLog for SubscriptionRollback<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            subject = self.subject,
            released = self.released,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("subscription_rollback", span_name = name, unit = self.unit)
    }
}

/// Releasing the subscriptions of a failed start also failed.
///
/// # Log Level
/// `warn!` - Some subscriptions may still be routed until the pilot disconnects
pub struct SubscriptionRollbackFailed<'a> {
    pub unit: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SubscriptionRollbackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler '{}' could not release its earlier subscriptions: {}",
            self.unit, self.error
        )
    }
}

impl StructuredLog for SubscriptionRollbackFailed<'_> {
    fn log(&self) {
        tracing::warn!(unit = self.unit, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("subscription_rollback_failed", span_name = name, unit = self.unit)
    }
}

/// A callback could not process a delivered message.
///
/// # Log Level
/// `warn!` - The message is dropped, the subscription continues
pub struct CallbackFailed<'a> {
    pub unit: &'a str,
    pub subject: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CallbackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler '{}' dropped message on '{}': {}",
            self.unit, self.subject, self.error
        )
    }
}

impl StructuredLog for CallbackFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            subject = self.subject,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("callback_failed", span_name = name, unit = self.unit)
    }
}

/// A message was received by a logging handler.
///
/// # Log Level
/// `info!` - This is the purpose of the unit
pub struct MessageReceived<'a> {
    pub unit: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

impl Display for MessageReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.unit, self.subject, self.body)
    }
}

impl StructuredLog for MessageReceived<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            subject = self.subject,
            size = self.body.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("message_received", span_name = name, subject = self.subject)
    }
}

/// A price crossed an alert threshold.
///
/// # Log Level
/// `info!` - Business notification
///
/// # Example
/// ```
/// use eventrix::observability::messages::unit::PriceAlertTriggered;
///
/// let msg = PriceAlertTriggered {
///     symbol: "BTCUSDT",
///     threshold: 200.0,
///     direction: "above",
///     price: 250.0,
/// };
/// assert_eq!(msg.to_string(), "BTCUSDT moved above 200 (now 250)");
/// ```
pub struct PriceAlertTriggered<'a> {
    pub symbol: &'a str,
    pub threshold: f64,
    pub direction: &'a str,
    pub price: f64,
}

impl Display for PriceAlertTriggered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} moved {} {} (now {})",
            self.symbol, self.direction, self.threshold, self.price
        )
    }
}

impl StructuredLog for PriceAlertTriggered<'_> {
    fn log(&self) {
        tracing::info!(
            symbol = self.symbol,
            threshold = self.threshold,
            direction = self.direction,
            price = self.price,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("price_alert", span_name = name, symbol = self.symbol)
    }
}
