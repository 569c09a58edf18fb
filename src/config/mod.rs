// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod registry;
mod unit_config;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, parse_config, validate_config, ConfigFormat,
    DeployerSettings, DeploymentConfig, PilotConfig, PilotKind, RuntimeConfig,
};
pub use registry::{UnitConstructor, UnitContext, UnitRegistry};
pub use unit_config::UnitConfig;
