// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pilot (transport) implementations.
//!
//! Units never talk to a broker directly. They publish and subscribe through
//! an `Arc<dyn Pilot>` handed to them at construction, and the concrete pilot
//! is chosen once per process from configuration.
//!
//! # Available Backends
//!
//! ## Memory
//! In-process routing between units of one process:
//! - **Ordering**: Per-subscription delivery in publish order
//! - **Isolation**: One worker task per subscription, slow callbacks never block publishers
//! - **Use Case**: Single-process deployments, tests
//!
//! ## Redis
//! Redis pub/sub:
//! - **Publish**: One multiplexed connection shared by all units
//! - **Subscribe**: One pub/sub connection and pump task per subscription
//! - **Use Case**: Units spread across processes or hosts
//!
//! ## Stub Units (Test-Only)
//! Units with scripted lifecycle outcomes (start failure, stop failure, hanging
//! stop) for deployer tests. Not available in production builds.
//!
//! # Example
//! ```rust
//! use eventrix::backends::factory::PilotFactory;
//! use eventrix::config::{PilotConfig, PilotKind};
//!
//! let pilot = PilotFactory::from_config(&PilotConfig {
//!     kind: PilotKind::Memory,
//!     url: None,
//! })?;
//! assert_eq!(pilot.name(), "memory");
//! # Ok::<(), eventrix::errors::PilotError>(())
//! ```

pub mod factory;
pub mod memory;
pub mod redis;
#[cfg(test)]
pub mod stub;
