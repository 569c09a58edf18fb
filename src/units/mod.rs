// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in unit types.
//!
//! | Type             | Capability | Subject(s)                                   |
//! |------------------|------------|----------------------------------------------|
//! | `price_feed`     | emitter    | publishes `{exchange}:{symbol}:{interval}`   |
//! | `price_alert`    | handler    | consumes market data, publishes `alerts:...` |
//! | `message_logger` | handler    | consumes the configured `subjects`           |

use std::sync::Arc;

use crate::config::{UnitContext, UnitRegistry};
use crate::engine::{EmitterUnit, HandlerUnit};
use crate::traits::Eventrix;

pub mod message_logger;
pub mod price_alert;
pub mod price_feed;

pub use message_logger::MessageLogger;
pub use price_alert::{PriceAlert, PriceAlertHandler, ThresholdTracker};
pub use price_feed::{PriceFeedEmitter, PriceTick};

/// Register every built-in unit type.
pub fn register_builtin_units(registry: &UnitRegistry) {
    registry.register(price_feed::TYPE_NAME, |ctx: UnitContext| {
        let emitter = PriceFeedEmitter::from_config(&ctx.config)?;
        Ok(Arc::new(EmitterUnit::new(emitter, ctx.pilot)) as Arc<dyn Eventrix>)
    });

    registry.register(price_alert::TYPE_NAME, |ctx: UnitContext| {
        let handler = PriceAlertHandler::from_config(&ctx.config, Arc::clone(&ctx.pilot))?;
        Ok(Arc::new(HandlerUnit::new(handler, ctx.pilot)) as Arc<dyn Eventrix>)
    });

    registry.register(message_logger::TYPE_NAME, |ctx: UnitContext| {
        let logger = MessageLogger::from_config(&ctx.config)?;
        Ok(Arc::new(HandlerUnit::new(logger, ctx.pilot)) as Arc<dyn Eventrix>)
    });
}
