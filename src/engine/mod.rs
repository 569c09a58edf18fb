// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod deployer;
pub mod emitter;
pub mod handler;
#[cfg(test)]
pub mod integration_tests;

pub use deployer::{Deployer, DeployerOptions, DeploymentInfo};
pub use emitter::{EmitterOptions, EmitterUnit};
pub use handler::HandlerUnit;
