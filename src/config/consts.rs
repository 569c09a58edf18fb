// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// How long the deployer waits for a single unit's stop before giving up on it
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// How many terminal deployment states the deployer remembers for `lifecycle`
pub const DEFAULT_FINISHED_RETENTION: usize = 1_024;
/// How long an emitter waits for its pump to exit before aborting it
pub const EMITTER_STOP_GRACE: Duration = Duration::from_secs(2);
/// How long a pilot waits for a subscription worker to drain on disconnect
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(2);
/// Delay between a feed failure and the next reconnect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Default broker URL for the redis pilot
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Market-data subject defaults: `{exchange}:{symbol}:{interval}`
pub const DEFAULT_EXCHANGE: &str = "binance";
pub const DEFAULT_INTERVAL: &str = "1m";
/// Default emission period of the synthetic price feed, in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1_000;
/// Default per-tick relative move of the random-walk feed (0.2%)
pub const DEFAULT_VOLATILITY: f64 = 0.002;
