// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process pilot.
//!
//! Every subscription owns an unbounded queue and a worker task that invokes
//! the callback for one message at a time. Publishing never blocks on slow
//! subscribers, delivery per subscription follows publish order, and different
//! subscriptions run concurrently.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::consts::DISCONNECT_GRACE;
use crate::errors::PilotError;
use crate::observability::messages::pilot::{PilotConnected, PilotDisconnected, SubscriptionChanged};
use crate::observability::messages::StructuredLog;
use crate::traits::{Message, MessageCallback, Payload, Pilot, SubscriptionHandle};

const PILOT_NAME: &str = "memory";

struct Route {
    id: u64,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct Routes {
    by_subject: HashMap<String, Vec<Route>>,
    workers: HashMap<u64, JoinHandle<()>>,
}

/// Pilot that routes messages between units of the same process.
pub struct InMemoryPilot {
    connected: AtomicBool,
    next_id: AtomicU64,
    routes: Mutex<Routes>,
    disconnect_grace: Duration,
}

impl InMemoryPilot {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            routes: Mutex::new(Routes::default()),
            disconnect_grace: DISCONNECT_GRACE,
        }
    }

    /// Number of live subscriptions on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.lock_routes()
            .by_subject
            .get(subject)
            .map_or(0, |routes| routes.len())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), PilotError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(PilotError::NotConnected(PILOT_NAME))
        }
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, Routes> {
        // A poisoned lock only means a panic elsewhere while holding it; the
        // routing table itself is still consistent.
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryPilot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Pilot for InMemoryPilot {
    async fn connect(&self) -> Result<(), PilotError> {
        self.connected.store(true, Ordering::SeqCst);
        PilotConnected {
            pilot: PILOT_NAME,
            endpoint: "in-process",
        }
        .log();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PilotError> {
        self.connected.store(false, Ordering::SeqCst);

        let workers: Vec<JoinHandle<()>> = {
            let mut routes = self.lock_routes();
            routes.by_subject.clear();
            routes.workers.drain().map(|(_, worker)| worker).collect()
        };

        PilotDisconnected {
            pilot: PILOT_NAME,
            dropped_subscriptions: workers.len(),
        }
        .log();

        // Senders are gone, so each worker drains what is already queued and exits.
        for mut worker in workers {
            if tokio::time::timeout(self.disconnect_grace, &mut worker)
                .await
                .is_err()
            {
                worker.abort();
            }
        }
        Ok(())
    }

    async fn publish(&self, subject: &str, payload: Payload) -> Result<(), PilotError> {
        self.ensure_connected()?;

        let routes = self.lock_routes();
        if let Some(targets) = routes.by_subject.get(subject) {
            for route in targets {
                // A closed queue means the worker is already gone; nothing to deliver to.
                let _ = route.sender.send(Message {
                    subject: subject.to_string(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        callback: MessageCallback,
    ) -> Result<SubscriptionHandle, PilotError> {
        self.ensure_connected()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();

        let worker = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                callback(message).await;
            }
        });

        {
            let mut routes = self.lock_routes();
            routes
                .by_subject
                .entry(subject.to_string())
                .or_default()
                .push(Route { id, sender });
            routes.workers.insert(id, worker);
        }

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
        let mut routes = self.lock_routes();

        let removed = match routes.by_subject.get_mut(handle.subject()) {
            Some(targets) => {
                let before = targets.len();
                targets.retain(|route| route.id != handle.id());
                let removed = targets.len() != before;
                if targets.is_empty() {
                    routes.by_subject.remove(handle.subject());
                }
                removed
            }
            None => false,
        };

        if !removed {
            return Err(PilotError::UnknownSubscription {
                id: handle.id(),
                subject: handle.subject().to_string(),
            });
        }

        // Detach the worker: it finishes the messages already queued and exits.
        // Awaiting it here would deadlock a callback that unsubscribes itself.
        routes.workers.remove(&handle.id());
        drop(routes);

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
    use crate::traits::callback;

    fn forwarding_callback(tx: mpsc::UnboundedSender<Message>) -> MessageCallback {
        callback(move |msg| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(msg);
            }
        })
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<Message>) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
    }

    async fn connected_pilot() -> InMemoryPilot {
        let pilot = InMemoryPilot::new();
        pilot.connect().await.unwrap();
        pilot
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let pilot = InMemoryPilot::new();
        let result = pilot.publish("a", Payload::text("x")).await;
        assert!(matches!(result, Err(PilotError::NotConnected("memory"))));
    }

    #[tokio::test]
    async fn test_delivery_preserves_publish_order() {
        let pilot = connected_pilot().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = pilot
            .subscribe("binance:BTCUSDT:1m", forwarding_callback(tx))
            .await
            .unwrap();

        for i in 0..100 {
            pilot
                .publish("binance:BTCUSDT:1m", Payload::text(i.to_string()))
                .await
                .unwrap();
        }

        for i in 0..100 {
            let msg = recv(&mut rx).await.expect("message delivered");
            assert_eq!(msg.subject, "binance:BTCUSDT:1m");
            assert_eq!(msg.payload, Payload::text(i.to_string()));
        }
    }

    #[tokio::test]
    async fn test_routing_is_exact_match() {
        let pilot = connected_pilot().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = pilot.subscribe("a:b:c", forwarding_callback(tx)).await.unwrap();

        pilot.publish("a:b", Payload::text("prefix")).await.unwrap();
        pilot.publish("a:b:c:d", Payload::text("longer")).await.unwrap();
        pilot.publish("a:b:c", Payload::text("exact")).await.unwrap();

        let msg = recv(&mut rx).await.unwrap();
        assert_eq!(msg.payload, Payload::text("exact"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let pilot = connected_pilot().await;
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let _h1 = pilot.subscribe("s", forwarding_callback(tx1)).await.unwrap();
        let _h2 = pilot.subscribe("s", forwarding_callback(tx2)).await.unwrap();
        assert_eq!(pilot.subscriber_count("s"), 2);

        pilot.publish("s", Payload::text("hello")).await.unwrap();

        assert_eq!(recv(&mut rx1).await.unwrap().payload, Payload::text("hello"));
        assert_eq!(recv(&mut rx2).await.unwrap().payload, Payload::text("hello"));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let pilot = connected_pilot().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = pilot.subscribe("s", forwarding_callback(tx)).await.unwrap();

        pilot.publish("s", Payload::text("before")).await.unwrap();
        assert_eq!(recv(&mut rx).await.unwrap().payload, Payload::text("before"));

        pilot.unsubscribe(handle).await.unwrap();
        assert_eq!(pilot.subscriber_count("s"), 0);

        pilot.publish("s", Payload::text("after")).await.unwrap();
        // The worker exits once its sender is gone, closing the channel.
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_handle() {
        let pilot = connected_pilot().await;
        let result = pilot.unsubscribe(SubscriptionHandle::new(42, "nowhere")).await;
        assert!(matches!(
            result,
            Err(PilotError::UnknownSubscription { id: 42, .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_drains_queued_messages() {
        let pilot = connected_pilot().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = pilot
            .subscribe(
                "slow",
                callback(move |msg| {
                    let tx = tx.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        let _ = tx.send(msg);
                    }
                }),
            )
            .await
            .unwrap();

        for i in 0..10 {
            pilot.publish("slow", Payload::text(i.to_string())).await.unwrap();
        }
        pilot.disconnect().await.unwrap();

        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 10);
        assert!(!pilot.is_connected());
        assert!(pilot.subscribe("slow", forwarding_callback(mpsc::unbounded_channel().0)).await.is_err());
    }
}
