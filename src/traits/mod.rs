// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod eventrix;
pub mod pilot;

pub use eventrix::{Emitter, Eventrix, Generator, Handler, LifecycleState, UnitStatus};
pub use pilot::{callback, Message, MessageCallback, Payload, Pilot, SubscriptionHandle};
