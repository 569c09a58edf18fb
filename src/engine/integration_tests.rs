// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::backends::memory::InMemoryPilot;
use crate::config::{UnitConfig, UnitRegistry};
use crate::engine::Deployer;
use crate::traits::{callback, LifecycleState, Message, Pilot};
use crate::units::price_alert::{Direction, PriceAlert};

/// Integration tests running the built-in units through the deployer on a real pilot
#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Arc<InMemoryPilot>, Deployer) {
        let pilot = Arc::new(InMemoryPilot::new());
        pilot.connect().await.expect("memory pilot connects");
        let deployer = Deployer::new(Arc::new(UnitRegistry::with_builtin_units()), pilot.clone());
        (pilot, deployer)
    }

    async fn collect(pilot: &InMemoryPilot, subject: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        pilot
            .subscribe(
                subject,
                callback(move |msg| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(msg);
                    }
                }),
            )
            .await
            .expect("collector subscribes");
        rx
    }

    async fn next_alert(rx: &mut mpsc::UnboundedReceiver<Message>) -> PriceAlert {
        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("alert within timeout")
            .expect("collector open");
        msg.payload.decode().expect("alert is valid json")
    }

    #[tokio::test]
    async fn test_price_feed_to_price_alert_pipeline() {
        let (pilot, deployer) = setup().await;
        let mut alerts = collect(&pilot, "alerts:BTCUSDT").await;

        deployer
            .deploy(
                "btc-alert",
                "price_alert",
                UnitConfig::new()
                    .with("symbol", "BTCUSDT")
                    .with("thresholds", vec![100.0, 200.0, 300.0]),
            )
            .await
            .unwrap();
        deployer
            .deploy(
                "btc-feed",
                "price_feed",
                UnitConfig::new()
                    .with("symbol", "BTCUSDT")
                    .with("tick_ms", 10)
                    .with("prices", vec![100.0, 150.0, 250.0, 150.0]),
            )
            .await
            .unwrap();

        let up = next_alert(&mut alerts).await;
        assert_eq!(
            up,
            PriceAlert {
                symbol: "BTCUSDT".to_string(),
                threshold: 200.0,
                direction: Direction::Above,
                price: 250.0,
                previous_price: 150.0,
            }
        );

        let down = next_alert(&mut alerts).await;
        assert_eq!(down.threshold, 200.0);
        assert_eq!(down.direction, Direction::Below);
        assert_eq!(down.price, 150.0);
        assert_eq!(down.previous_price, 250.0);

        let snapshot = deployer.get_all_deployments();
        let ids: Vec<&str> = snapshot.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["btc-alert", "btc-feed"]);
        assert!(snapshot.iter().all(|d| d.status.state == LifecycleState::Running));
        assert!(snapshot[0].status.details["handler"]["alerts_sent"].as_u64().unwrap() >= 2);

        deployer.shutdown().await.unwrap();
        assert!(deployer.get_all_deployments().is_empty());
        assert_eq!(pilot.subscriber_count("binance:BTCUSDT:1m"), 0);
    }

    #[tokio::test]
    async fn test_logger_sees_alerts_and_undeploy_releases_subscriptions() {
        let (pilot, deployer) = setup().await;

        deployer
            .deploy(
                "logger",
                "message_logger",
                UnitConfig::new().with("subjects", vec!["alerts:ETH"]),
            )
            .await
            .unwrap();
        assert_eq!(pilot.subscriber_count("alerts:ETH"), 1);

        deployer
            .deploy(
                "eth-alert",
                "price_alert",
                UnitConfig::new()
                    .with("symbol", "ETH")
                    .with("thresholds", vec![10.0]),
            )
            .await
            .unwrap();
        deployer
            .deploy(
                "eth-feed",
                "price_feed",
                UnitConfig::new()
                    .with("symbol", "ETH")
                    .with("tick_ms", 5)
                    .with("prices", vec![9.0, 11.0]),
            )
            .await
            .unwrap();

        let mut received = 0;
        for _ in 0..200 {
            received = deployer.get_status("logger").unwrap().details["handler"]["received"]
                ["alerts:ETH"]
                .as_u64()
                .unwrap_or(0);
            if received >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(received >= 2, "logger saw {} alerts", received);

        deployer.undeploy("logger").await.unwrap();
        assert_eq!(pilot.subscriber_count("alerts:ETH"), 0);

        deployer.undeploy("eth-feed").await.unwrap();
        deployer.undeploy("eth-alert").await.unwrap();
        assert_eq!(pilot.subscriber_count("binance:ETH:1m"), 0);
        assert!(deployer.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_unit_options_surface_as_construction_errors() {
        let (_pilot, deployer) = setup().await;

        let result = deployer
            .deploy("feed", "price_feed", UnitConfig::new().with("symbol", "BTC"))
            .await;
        assert!(matches!(
            result,
            Err(crate::errors::DeployError::ConstructionError { ref type_name, .. }) if type_name == "price_feed"
        ));
        assert!(deployer.is_empty());
    }

    #[tokio::test]
    async fn test_handler_start_fails_when_pilot_is_down() {
        let pilot = Arc::new(InMemoryPilot::new());
        let deployer = Deployer::new(Arc::new(UnitRegistry::with_builtin_units()), pilot.clone());

        let result = deployer
            .deploy(
                "logger",
                "message_logger",
                UnitConfig::new().with("subjects", vec!["a", "b"]),
            )
            .await;
        assert!(matches!(result, Err(crate::errors::DeployError::StartError { .. })));
        assert!(deployer.is_empty());
        assert_eq!(deployer.lifecycle("logger"), Some(LifecycleState::Failed));
    }
}
