// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `price_alert`: publishes an alert whenever a price crosses a threshold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::consts::{DEFAULT_EXCHANGE, DEFAULT_INTERVAL};
use crate::config::UnitConfig;
use crate::errors::UnitError;
use crate::observability::messages::unit::{CallbackFailed, PriceAlertTriggered};
use crate::observability::messages::StructuredLog;
use crate::traits::{callback, Handler, Message, MessageCallback, Payload, Pilot};
use crate::units::price_feed::{market_subject, PriceTick};

pub const TYPE_NAME: &str = "price_alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Above => "above",
            Direction::Below => "below",
        })
    }
}

/// Alert published on the alert subject, one per crossed threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub symbol: String,
    pub threshold: f64,
    pub direction: Direction,
    pub price: f64,
    pub previous_price: f64,
}

/// Detects threshold crossings between consecutive prices.
///
/// Thresholds are kept sorted and deduplicated. A price's position is its
/// upper-bound insertion index, so a price equal to a threshold sits above it.
/// A move crosses every threshold between the old and new positions.
///
/// # Example
/// ```
/// use eventrix::units::price_alert::{Direction, ThresholdTracker};
///
/// let mut tracker = ThresholdTracker::new(vec![300.0, 100.0, 200.0]);
/// assert!(tracker.observe(150.0).is_empty()); // first price only seeds
/// assert_eq!(tracker.observe(310.0), vec![(200.0, Direction::Above), (300.0, Direction::Above)]);
/// ```
#[derive(Debug, Clone)]
pub struct ThresholdTracker {
    thresholds: Vec<f64>,
    previous: Option<f64>,
}

impl ThresholdTracker {
    pub fn new(mut thresholds: Vec<f64>) -> Self {
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        Self {
            thresholds,
            previous: None,
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    fn position(&self, price: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= price)
    }

    /// Record `price` and return the thresholds crossed since the previous
    /// price, in the order the move crossed them.
    pub fn observe(&mut self, price: f64) -> Vec<(f64, Direction)> {
        let Some(previous) = self.previous.replace(price) else {
            return Vec::new();
        };

        let from = self.position(previous);
        let to = self.position(price);

        if to > from {
            self.thresholds[from..to]
                .iter()
                .map(|t| (*t, Direction::Above))
                .collect()
        } else {
            self.thresholds[to..from]
                .iter()
                .rev()
                .map(|t| (*t, Direction::Below))
                .collect()
        }
    }
}

/// Handler watching one symbol's market data.
pub struct PriceAlertHandler {
    symbol: String,
    subject: String,
    alert_subject: String,
    pilot: Arc<dyn Pilot>,
    tracker: Mutex<ThresholdTracker>,
    alerts_sent: AtomicU64,
}

impl PriceAlertHandler {
    pub fn from_config(cfg: &UnitConfig, pilot: Arc<dyn Pilot>) -> Result<Self, UnitError> {
        let symbol = cfg.require_str("symbol")?.to_string();
        let exchange = cfg.get_str_or("exchange", DEFAULT_EXCHANGE)?;
        let interval = cfg.get_str_or("interval", DEFAULT_INTERVAL)?;

        let thresholds = cfg.require_f64_list("thresholds")?;
        if thresholds.is_empty() {
            return Err(UnitError::invalid_option("thresholds", "must not be empty"));
        }
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(UnitError::invalid_option("thresholds", "must be finite numbers"));
        }

        let default_alert_subject = format!("alerts:{}", symbol);
        let alert_subject = cfg
            .get_str_or("alert_subject", &default_alert_subject)?
            .to_string();

        Ok(Self {
            subject: market_subject(exchange, &symbol, interval),
            symbol,
            alert_subject,
            pilot,
            tracker: Mutex::new(ThresholdTracker::new(thresholds)),
            alerts_sent: AtomicU64::new(0),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn alert_subject(&self) -> &str {
        &self.alert_subject
    }

    async fn on_tick(&self, message: Message) {
        let tick: PriceTick = match message.payload.decode() {
            Ok(tick) => tick,
            Err(e) => {
                CallbackFailed {
                    unit: TYPE_NAME,
                    subject: &message.subject,
                    error: &e,
                }
                .log();
                return;
            }
        };

        let (crossed, previous) = {
            let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
            let previous = tracker.previous();
            (tracker.observe(tick.price), previous)
        };
        let Some(previous_price) = previous else {
            return;
        };

        for (threshold, direction) in crossed {
            let alert = PriceAlert {
                symbol: self.symbol.clone(),
                threshold,
                direction,
                price: tick.price,
                previous_price,
            };
            PriceAlertTriggered {
                symbol: &alert.symbol,
                threshold,
                direction: &direction.to_string(),
                price: alert.price,
            }
            .log();

            let published = match Payload::json(&alert) {
                Ok(payload) => self.pilot.publish(&self.alert_subject, payload).await,
                Err(e) => Err(e),
            };
            match published {
                Ok(()) => {
                    self.alerts_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => CallbackFailed {
                    unit: TYPE_NAME,
                    subject: &self.alert_subject,
                    error: &e,
                }
                .log(),
            }
        }
    }
}

impl Handler for PriceAlertHandler {
    fn name(&self) -> &'static str {
        TYPE_NAME
    }

    fn get_handlers(self: Arc<Self>) -> Vec<(String, MessageCallback)> {
        let subject = self.subject.clone();
        let on_tick = callback(move |message| {
            let this = Arc::clone(&self);
            async move { this.on_tick(message).await }
        });
        vec![(subject, on_tick)]
    }

    fn details(&self) -> serde_json::Value {
        let tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::json!({
            "symbol": self.symbol,
            "subject": self.subject,
            "alert_subject": self.alert_subject,
            "thresholds": tracker.thresholds(),
            "last_price": tracker.previous(),
            "alerts_sent": self.alerts_sent.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryPilot;
    use Direction::*;

    #[test]
    fn test_alerts_only_on_crossings() {
        let mut tracker = ThresholdTracker::new(vec![100.0, 200.0, 300.0]);

        let observed: Vec<Vec<(f64, Direction)>> = [100.0, 150.0, 250.0, 150.0]
            .into_iter()
            .map(|price| tracker.observe(price))
            .collect();

        assert_eq!(
            observed,
            vec![vec![], vec![], vec![(200.0, Above)], vec![(200.0, Below)]]
        );
    }

    #[test]
    fn test_crossings_table() {
        struct Case {
            name: &'static str,
            prices: &'static [f64],
            expected: Vec<(f64, Direction)>,
        }

        let cases = [
            Case {
                name: "landing exactly on a threshold counts as crossing up",
                prices: &[150.0, 200.0],
                expected: vec![(200.0, Above)],
            },
            Case {
                name: "leaving a threshold downward crosses it",
                prices: &[200.0, 199.0],
                expected: vec![(200.0, Below)],
            },
            Case {
                name: "jump over several thresholds up",
                prices: &[50.0, 350.0],
                expected: vec![(100.0, Above), (200.0, Above), (300.0, Above)],
            },
            Case {
                name: "fall over several thresholds reports in crossing order",
                prices: &[350.0, 150.0],
                expected: vec![(300.0, Below), (200.0, Below)],
            },
            Case {
                name: "move within a band",
                prices: &[210.0, 290.0],
                expected: vec![],
            },
            Case {
                name: "unchanged price",
                prices: &[300.0, 300.0],
                expected: vec![],
            },
        ];

        for case in cases {
            let mut tracker = ThresholdTracker::new(vec![300.0, 100.0, 200.0, 200.0]);
            let mut last = Vec::new();
            for price in case.prices {
                last = tracker.observe(*price);
            }
            assert_eq!(last, case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_thresholds_sorted_and_deduplicated() {
        let tracker = ThresholdTracker::new(vec![3.0, 1.0, 2.0, 1.0]);
        assert_eq!(tracker.thresholds(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_config() {
        let pilot: Arc<dyn Pilot> = Arc::new(InMemoryPilot::new());

        let handler = PriceAlertHandler::from_config(
            &UnitConfig::new()
                .with("symbol", "BTCUSDT")
                .with("thresholds", vec![100.0, 200.0]),
            Arc::clone(&pilot),
        )
        .unwrap();
        assert_eq!(handler.subject(), "binance:BTCUSDT:1m");
        assert_eq!(handler.alert_subject(), "alerts:BTCUSDT");

        let custom = PriceAlertHandler::from_config(
            &UnitConfig::new()
                .with("symbol", "ETH")
                .with("exchange", "kraken")
                .with("interval", "1h")
                .with("alert_subject", "ops:eth")
                .with("thresholds", vec![1.0]),
            Arc::clone(&pilot),
        )
        .unwrap();
        assert_eq!(custom.subject(), "kraken:ETH:1h");
        assert_eq!(custom.alert_subject(), "ops:eth");

        let missing = PriceAlertHandler::from_config(
            &UnitConfig::new().with("symbol", "BTCUSDT"),
            Arc::clone(&pilot),
        );
        assert!(matches!(missing, Err(UnitError::MissingOption(o)) if o == "thresholds"));

        let empty = PriceAlertHandler::from_config(
            &UnitConfig::new()
                .with("symbol", "BTCUSDT")
                .with("thresholds", Vec::<f64>::new()),
            pilot,
        );
        assert!(matches!(empty, Err(UnitError::InvalidOption { .. })));
    }
}
