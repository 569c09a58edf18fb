// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Publish/subscribe transport abstraction shared by every deployed unit.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::errors::PilotError;

/// Opaque message body carried by a pilot.
///
/// The core never interprets payloads. Units that exchange structured values
/// use the JSON helpers.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self(text.into().into_bytes())
    }

    /// Serialize `value` as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, PilotError> {
        serde_json::to_vec(value)
            .map(Self)
            .map_err(PilotError::Encode)
    }

    /// Deserialize the payload as JSON into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PilotError> {
        serde_json::from_slice(&self.0).map_err(PilotError::Decode)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => write!(f, "Payload({:?})", text),
            Err(_) => write!(f, "Payload({} bytes)", self.0.len()),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A payload as delivered to a subscriber, tagged with the subject it was published on.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub payload: Payload,
}

/// Callback invoked once per delivered message.
///
/// The returned future is awaited before the next message on the same
/// subscription is delivered.
pub type MessageCallback = Arc<dyn Fn(Message) -> BoxFuture<'static, ()> + Send + Sync>;

/// Token identifying one subscription. Must be handed back unchanged to
/// [`Pilot::unsubscribe`]; it is deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    subject: String,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: u64, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: subject.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Subject-addressed publish/subscribe transport.
///
/// Routing is exact string matching on the subject. Implementations decide how
/// delivery is scheduled, but must deliver messages of a single subscription
/// one at a time and in the order they were received.
#[async_trait]
pub trait Pilot: Send + Sync {
    async fn connect(&self) -> Result<(), PilotError>;

    /// Drop every subscription and release the connection.
    async fn disconnect(&self) -> Result<(), PilotError>;

    async fn publish(&self, subject: &str, payload: Payload) -> Result<(), PilotError>;

    async fn subscribe(
        &self,
        subject: &str,
        callback: MessageCallback,
    ) -> Result<SubscriptionHandle, PilotError>;

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), PilotError>;

    fn name(&self) -> &'static str;
}

/// Wrap an async closure into a [`MessageCallback`].
pub fn callback<F, Fut>(f: F) -> MessageCallback
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move |msg: Message| -> BoxFuture<'static, ()> { Box::pin(f(msg)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Tick {
        price: f64,
    }

    #[test]
    fn test_payload_json_helpers() {
        let payload = Payload::json(&Tick { price: 101.5 }).unwrap();
        assert_eq!(payload.as_bytes(), br#"{"price":101.5}"#);
        assert_eq!(payload.decode::<Tick>().unwrap(), Tick { price: 101.5 });
    }

    #[test]
    fn test_payload_decode_rejects_garbage() {
        let payload = Payload::text("not json");
        assert!(matches!(
            payload.decode::<Tick>(),
            Err(PilotError::Decode(_))
        ));
    }

    #[test]
    fn test_payload_debug_falls_back_to_length() {
        assert_eq!(format!("{:?}", Payload::text("hi")), "Payload(\"hi\")");
        assert_eq!(
            format!("{:?}", Payload::new(vec![0xff, 0xfe])),
            "Payload(2 bytes)"
        );
    }
}
