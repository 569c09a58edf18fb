// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod deploy;
mod pilot;
mod unit;

pub use config::ConfigError;
pub use deploy::{DeployError, StopFailure};
pub use pilot::PilotError;
pub use unit::UnitError;
