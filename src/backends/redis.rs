// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pilot backed by Redis pub/sub.
//!
//! Publishing goes through one multiplexed connection shared by every unit.
//! Each subscription opens its own pub/sub connection and a pump task that
//! feeds messages to the callback one at a time, so per-subscription ordering
//! matches the broker's delivery order. Unsubscribing cancels the pump, which
//! drops the connection and with it the server-side subscription.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::PilotError;
use crate::observability::messages::pilot::{
    PilotConnected, PilotDisconnected, SubscriptionChanged, SubscriptionStreamEnded,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Message, MessageCallback, Payload, Pilot, SubscriptionHandle};

const PILOT_NAME: &str = "redis";

struct Subscription {
    subject: String,
    cancel: CancellationToken,
}

/// Pilot that routes messages through a Redis server.
pub struct RedisPilot {
    client: Client,
    url: String,
    connection: Mutex<Option<MultiplexedConnection>>,
    subscriptions: Mutex<HashMap<u64, Subscription>>,
    next_id: AtomicU64,
}

impl RedisPilot {
    /// Validates the URL; no connection is made until [`Pilot::connect`].
    ///
    /// # Arguments
    /// * `url` - The redis URL (e.g., "redis://127.0.0.1/").
    pub fn new(url: &str) -> Result<Self, PilotError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            url: url.to_string(),
            connection: Mutex::new(None),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn publisher(&self) -> Result<MultiplexedConnection, PilotError> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(PilotError::NotConnected(PILOT_NAME))
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Subscription>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Pilot for RedisPilot {
    async fn connect(&self) -> Result<(), PilotError> {
        let connection = self.client.get_multiplexed_async_connection().await?;
        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(connection);
        PilotConnected {
            pilot: PILOT_NAME,
            endpoint: &self.url,
        }
        .log();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PilotError> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let dropped: Vec<Subscription> = self
            .lock_subscriptions()
            .drain()
            .map(|(_, subscription)| subscription)
            .collect();
        for subscription in &dropped {
            subscription.cancel.cancel();
        }

        PilotDisconnected {
            pilot: PILOT_NAME,
            dropped_subscriptions: dropped.len(),
        }
        .log();
        Ok(())
    }

    async fn publish(&self, subject: &str, payload: Payload) -> Result<(), PilotError> {
        let mut connection = self.publisher()?;
        let _: () = connection.publish(subject, payload.into_bytes()).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        callback: MessageCallback,
    ) -> Result<SubscriptionHandle, PilotError> {
        // Subscriptions share the pilot's connected state even though each
        // one opens its own connection.
        self.publisher()?;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(subject).await?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let owned_subject = subject.to_string();

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = messages.next() => match next {
                        Some(msg) => {
                            let payload: Vec<u8> = match msg.get_payload() {
                                Ok(bytes) => bytes,
                                Err(_) => continue,
                            };
                            callback(Message {
                                subject: msg.get_channel_name().to_string(),
                                payload: Payload::new(payload),
                            })
                            .await;
                        }
                        None => {
                            SubscriptionStreamEnded {
                                pilot: PILOT_NAME,
                                subject: &owned_subject,
                            }
                            .log();
                            break;
                        }
                    },
                }
            }
        });

        self.lock_subscriptions().insert(
            id,
            Subscription {
                subject: subject.to_string(),
                cancel,
            },
        );

        SubscriptionChanged {
            pilot: PILOT_NAME,
            subject,
            subscription_id: id,
            opened: true,
        }
        .log();

        Ok(SubscriptionHandle::new(id, subject))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), PilotError> {
        let removed = {
            let mut subscriptions = self.lock_subscriptions();
            match subscriptions.get(&handle.id()) {
                Some(sub) if sub.subject == handle.subject() => subscriptions.remove(&handle.id()),
                _ => None,
            }
        };

        let Some(subscription) = removed else {
            return Err(PilotError::UnknownSubscription {
                id: handle.id(),
                subject: handle.subject().to_string(),
            });
        };
        subscription.cancel.cancel();

        SubscriptionChanged {
            pilot: PILOT_NAME,
            subject: handle.subject(),
            subscription_id: handle.id(),
            opened: false,
        }
        .log();
        Ok(())
    }

    fn name(&self) -> &'static str {
        PILOT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_url() {
        assert!(matches!(
            RedisPilot::new("not a url"),
            Err(PilotError::Broker(_))
        ));
    }

    #[tokio::test]
    async fn test_requires_connect_before_use() {
        let pilot = RedisPilot::new("redis://127.0.0.1:1/").unwrap();
        assert_eq!(pilot.url(), "redis://127.0.0.1:1/");

        let publish = pilot.publish("a", Payload::text("x")).await;
        assert!(matches!(publish, Err(PilotError::NotConnected("redis"))));

        let subscribe = pilot
            .subscribe("a", crate::traits::callback(|_msg| async {}))
            .await;
        assert!(matches!(subscribe, Err(PilotError::NotConnected("redis"))));

        let unsubscribe = pilot.unsubscribe(SubscriptionHandle::new(1, "a")).await;
        assert!(matches!(
            unsubscribe,
            Err(PilotError::UnknownSubscription { id: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_harmless() {
        let pilot = RedisPilot::new("redis://127.0.0.1/").unwrap();
        pilot.disconnect().await.unwrap();
    }
}
