// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::memory::InMemoryPilot;
use super::redis::RedisPilot;
use crate::config::{PilotConfig, PilotKind};
use crate::errors::PilotError;
use crate::traits::Pilot;

/// Factory for creating pilots from configuration
pub struct PilotFactory;

impl PilotFactory {
    /// Build the pilot selected by `cfg.kind`. The pilot is returned
    /// unconnected; call [`Pilot::connect`] before handing it to a deployer.
    pub fn from_config(cfg: &PilotConfig) -> Result<Arc<dyn Pilot>, PilotError> {
        match cfg.kind {
            PilotKind::Memory => Ok(Arc::new(InMemoryPilot::new())),
            PilotKind::Redis => Ok(Arc::new(RedisPilot::new(cfg.url_or_default())?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let cases = [
            (PilotKind::Memory, None, Some("memory")),
            (PilotKind::Redis, None, Some("redis")),
            (PilotKind::Redis, Some("redis://cache:6380/"), Some("redis")),
            (PilotKind::Redis, Some("::garbage::"), None),
        ];

        for (kind, url, expected) in cases {
            let cfg = PilotConfig {
                kind,
                url: url.map(str::to_string),
            };
            let pilot = PilotFactory::from_config(&cfg);
            assert_eq!(pilot.ok().map(|p| p.name()), expected, "{:?} {:?}", kind, url);
        }
    }
}
