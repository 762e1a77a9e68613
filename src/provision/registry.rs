//! Explicit provisioner registry.
//!
//! The registry maps os-release IDs to strategy constructors. It is a
//! plain value constructed once at process startup and passed by reference
//! to the dispatch point; strategies register through explicit calls, not
//! module-load side effects. Registration is first-wins: registering an ID
//! twice is rejected with a validation error.

use std::collections::BTreeMap;

use crate::error::RsmachineError;

use super::{ProvisionerFactory, clearlinux};

/// Mapping from os-release ID to provisioner constructor.
#[derive(Default)]
pub struct ProvisionerRegistry {
    entries: BTreeMap<String, ProvisionerFactory>,
}

impl ProvisionerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all shipped strategies registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        clearlinux::register(&mut registry).expect("default registrations are distinct");
        registry
    }

    /// Registers a strategy constructor for an os-release ID.
    ///
    /// First-wins: registering an already-known ID returns a validation
    /// error and leaves the existing entry untouched.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        factory: ProvisionerFactory,
    ) -> Result<(), RsmachineError> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(RsmachineError::Validation(format!(
                "provisioner for OS '{}' is already registered",
                id
            )));
        }
        self.entries.insert(id, factory);
        Ok(())
    }

    /// Looks up the constructor registered for an os-release ID.
    pub fn lookup(&self, id: &str) -> Option<ProvisionerFactory> {
        self.entries.get(id).copied()
    }

    /// Iterates the registered os-release IDs in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
