// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational log lines in the runtime are produced from the
//! message types in [`messages`]. Each type implements `Display` for the human
//! readable text and [`messages::StructuredLog`] to emit the event with typed
//! fields at its documented level.
//!
//! # Usage
//!
//! ```rust
//! use eventrix::observability::messages::deployer::DeploymentRunning;
//! use eventrix::observability::messages::StructuredLog;
//! use std::time::Duration;
//!
//! DeploymentRunning {
//!     id: "btc-feed",
//!     type_name: "price_feed",
//!     duration: Duration::from_millis(3),
//! }
//! .log();
//! ```

pub mod messages;
