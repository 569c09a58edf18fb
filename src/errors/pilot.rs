// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by pilot (transport) implementations.

use thiserror::Error;

/// Failures surfaced by a [`crate::traits::Pilot`].
#[derive(Error, Debug)]
pub enum PilotError {
    /// An operation that needs a live connection was called before `connect`
    /// or after `disconnect`.
    #[error("Pilot '{0}' is not connected")]
    NotConnected(&'static str),

    /// `unsubscribe` was given a handle this pilot never issued, or one that
    /// was already released.
    #[error("Unknown subscription {id} on subject '{subject}'")]
    UnknownSubscription { id: u64, subject: String },

    /// Payload could not be serialized.
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Payload could not be deserialized into the requested type.
    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Error reported by the underlying message broker.
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),
}
