// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::config::UnitConfig;
use crate::errors::UnitError;
use crate::observability::messages::deployer::{UnitTypeOverwritten, UnitTypeRegistered};
use crate::observability::messages::StructuredLog;
use crate::traits::{Eventrix, Pilot};

/// Everything a constructor receives when a unit is deployed.
#[derive(Clone)]
pub struct UnitContext {
    /// Deployment ID the unit is being created for.
    pub id: String,
    /// Transport shared by every unit of this deployer.
    pub pilot: Arc<dyn Pilot>,
    pub config: UnitConfig,
}

impl fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("id", &self.id)
            .field("pilot", &self.pilot.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Factory that builds a unit bound to a pilot and its configuration.
pub type UnitConstructor =
    Arc<dyn Fn(UnitContext) -> Result<Arc<dyn Eventrix>, UnitError> + Send + Sync>;

/// Approved unit types, keyed by type name.
///
/// Deploy requests name a type; only types registered here can be
/// instantiated. The registry is constructed at startup and shared by `Arc`;
/// registration and lookup go through one lock so it may be used from
/// concurrent callers.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use eventrix::config::UnitRegistry;
///
/// let registry = UnitRegistry::with_builtin_units();
/// assert!(registry.has("price_alert"));
/// assert!(registry.get("shell_exec").is_none());
/// ```
#[derive(Default)]
pub struct UnitRegistry {
    constructors: RwLock<BTreeMap<String, UnitConstructor>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every unit type shipped in [`crate::units`].
    pub fn with_builtin_units() -> Self {
        let registry = Self::new();
        crate::units::register_builtin_units(&registry);
        registry
    }

    /// Bind `name` to `constructor`. Re-registering a name replaces the previous
    /// constructor and logs a warning.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(UnitContext) -> Result<Arc<dyn Eventrix>, UnitError> + Send + Sync + 'static,
    {
        self.register_constructor(name, Arc::new(constructor));
    }

    pub fn register_constructor(&self, name: impl Into<String>, constructor: UnitConstructor) {
        let name = name.into();
        let replaced = self
            .constructors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone(), constructor)
            .is_some();

        if replaced {
            UnitTypeOverwritten { name: &name }.log();
        } else {
            UnitTypeRegistered { name: &name }.log();
        }
    }

    /// Look up a constructor. `None` is an ordinary outcome, not a failure.
    pub fn get(&self, name: &str) -> Option<UnitConstructor> {
        self.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Snapshot of every registration.
    pub fn get_all(&self) -> BTreeMap<String, UnitConstructor> {
        self.read().clone()
    }

    /// Sorted type names.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, UnitConstructor>> {
        self.constructors.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("unit_types", &self.names())
            .finish()
    }
}
