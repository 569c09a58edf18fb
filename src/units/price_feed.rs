// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `price_feed`: market-data emitter.
//!
//! Produces one [`PriceTick`] per `tick_ms` on `{exchange}:{symbol}:{interval}`.
//! Prices either replay a scripted list (looping) or follow a random walk.
//!
//! # Options
//! * `symbol` - Required, e.g. `BTCUSDT`
//! * `exchange` - Default `binance`
//! * `interval` - Default `1m`
//! * `tick_ms` - Default `1000`
//! * `prices` - Scripted prices, replayed in a loop
//! * `start_price`, `volatility`, `seed` - Random walk; `volatility` is the
//!   largest relative move per tick (default `0.002`)

use futures_util::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::consts::{DEFAULT_EXCHANGE, DEFAULT_INTERVAL, DEFAULT_TICK_MS, DEFAULT_VOLATILITY};
use crate::config::UnitConfig;
use crate::errors::UnitError;
use crate::traits::{Emitter, Generator, Payload};

pub const TYPE_NAME: &str = "price_feed";

/// One price observation as published on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub exchange: String,
    pub interval: String,
    pub price: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Market-data subject for a symbol.
pub fn market_subject(exchange: &str, symbol: &str, interval: &str) -> String {
    format!("{}:{}:{}", exchange, symbol, interval)
}

#[derive(Debug, Clone)]
enum PriceSource {
    Replay(Arc<[f64]>),
    RandomWalk {
        start_price: f64,
        volatility: f64,
        seed: Option<u64>,
    },
}

#[derive(Clone)]
struct TickContext {
    symbol: String,
    exchange: String,
    interval: String,
    ticks: Arc<AtomicU64>,
    last_price: Arc<Mutex<Option<f64>>>,
}

impl TickContext {
    fn tick(&self, price: f64) -> Result<Payload, UnitError> {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        *self.last_price.lock().unwrap_or_else(|e| e.into_inner()) = Some(price);
        let tick = PriceTick {
            symbol: self.symbol.clone(),
            exchange: self.exchange.clone(),
            interval: self.interval.clone(),
            price,
            timestamp: now_millis(),
        };
        Ok(Payload::json(&tick)?)
    }
}

/// Emitter publishing synthetic or scripted price ticks.
pub struct PriceFeedEmitter {
    context: TickContext,
    tick: Duration,
    source: PriceSource,
}

impl PriceFeedEmitter {
    pub fn from_config(cfg: &UnitConfig) -> Result<Self, UnitError> {
        let symbol = cfg.require_str("symbol")?.to_string();
        let exchange = cfg.get_str_or("exchange", DEFAULT_EXCHANGE)?.to_string();
        let interval = cfg.get_str_or("interval", DEFAULT_INTERVAL)?.to_string();

        let tick_ms = cfg.get_u64_or("tick_ms", DEFAULT_TICK_MS)?;
        if tick_ms == 0 {
            return Err(UnitError::invalid_option("tick_ms", "must be greater than zero"));
        }

        let source = match (cfg.get_f64_list("prices")?, cfg.contains_key("start_price")) {
            (Some(_), true) => {
                return Err(UnitError::invalid_option(
                    "prices",
                    "cannot be combined with start_price",
                ))
            }
            (Some(prices), false) => {
                if prices.is_empty() {
                    return Err(UnitError::invalid_option("prices", "must not be empty"));
                }
                if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
                    return Err(UnitError::invalid_option("prices", "must all be positive"));
                }
                PriceSource::Replay(prices.into())
            }
            (None, true) => {
                let start_price = cfg.get_f64_or("start_price", 0.0)?;
                if !start_price.is_finite() || start_price <= 0.0 {
                    return Err(UnitError::invalid_option("start_price", "must be positive"));
                }
                let volatility = cfg.get_f64_or("volatility", DEFAULT_VOLATILITY)?;
                if !(0.0..1.0).contains(&volatility) {
                    return Err(UnitError::invalid_option("volatility", "must be in [0, 1)"));
                }
                let seed = cfg
                    .get("seed")
                    .map(|v| {
                        v.as_u64()
                            .ok_or_else(|| UnitError::invalid_option("seed", "expected an integer"))
                    })
                    .transpose()?;
                PriceSource::RandomWalk {
                    start_price,
                    volatility,
                    seed,
                }
            }
            (None, false) => return Err(UnitError::MissingOption("prices or start_price".to_string())),
        };

        Ok(Self {
            context: TickContext {
                symbol,
                exchange,
                interval,
                ticks: Arc::new(AtomicU64::new(0)),
                last_price: Arc::new(Mutex::new(None)),
            },
            tick: Duration::from_millis(tick_ms),
            source,
        })
    }

    pub fn subject(&self) -> String {
        market_subject(&self.context.exchange, &self.context.symbol, &self.context.interval)
    }

    pub fn last_price(&self) -> Option<f64> {
        *self.context.last_price.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Emitter for PriceFeedEmitter {
    fn name(&self) -> &'static str {
        TYPE_NAME
    }

    fn get_generators(&self) -> Vec<(String, Generator)> {
        let context = self.context.clone();
        let period = self.tick;
        let source = self.source.clone();

        let generator: Generator = Box::new(move || {
            let context = context.clone();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            match &source {
                PriceSource::Replay(prices) => {
                    let prices = Arc::clone(prices);
                    stream::unfold((ticker, 0usize), move |(mut ticker, index)| {
                        let context = context.clone();
                        let price = prices[index % prices.len()];
                        async move {
                            ticker.tick().await;
                            Some((context.tick(price), (ticker, index + 1)))
                        }
                    })
                    .boxed()
                }
                PriceSource::RandomWalk {
                    start_price,
                    volatility,
                    seed,
                } => {
                    let rng = match seed {
                        Some(seed) => StdRng::seed_from_u64(*seed),
                        None => StdRng::from_entropy(),
                    };
                    // Resume from the last published price after a reconnect.
                    let price = context
                        .last_price
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .unwrap_or(*start_price);
                    let volatility = *volatility;

                    stream::unfold(
                        (ticker, rng, price, true),
                        move |(mut ticker, mut rng, price, first)| {
                            let context = context.clone();
                            let next = if first || volatility == 0.0 {
                                price
                            } else {
                                let step: f64 = rng.gen_range(-volatility..=volatility);
                                (price * (1.0 + step)).max(f64::MIN_POSITIVE)
                            };
                            async move {
                                ticker.tick().await;
                                Some((context.tick(next), (ticker, rng, next, false)))
                            }
                        },
                    )
                    .boxed()
                }
            }
        });

        vec![(self.subject(), generator)]
    }

    fn details(&self) -> serde_json::Value {
        let mode = match self.source {
            PriceSource::Replay(_) => "replay",
            PriceSource::RandomWalk { .. } => "random_walk",
        };
        serde_json::json!({
            "subject": self.subject(),
            "mode": mode,
            "tick_ms": self.tick.as_millis() as u64,
            "ticks": self.context.ticks.load(Ordering::Relaxed),
            "last_price": self.last_price(),
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
