// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // pilot implementations
pub mod config;     // runtime config + unit registry
pub mod engine;     // deployer and lifecycle adapters
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // unified abstractions
pub mod units;      // built-in unit types
pub mod utils;
