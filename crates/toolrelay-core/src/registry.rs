//! In-memory registry of configured tool servers.
//!
//! Holds definitions and the enabled set. Persistence is the caller's
//! concern: load definitions in, read them back out with `definitions()`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ServerDefinition;

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Server already registered: {0}")]
    Duplicate(String),

    #[error("Server not found: {0}")]
    NotFound(String),

    #[error("Invalid server definition: {0}")]
    Invalid(String),
}

/// A definition together with its enabled flag, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(flatten)]
    pub definition: ServerDefinition,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

/// Configured servers and which of them are enabled.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Vec<ServerDefinition>,
    enabled: HashSet<String>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored entries. Invalid or duplicate entries are
    /// rejected with the first error.
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.add(entry.definition, entry.enabled)?;
        }
        Ok(registry)
    }

    /// Entries suitable for persisting.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.servers
            .iter()
            .map(|def| RegistryEntry {
                definition: def.clone(),
                enabled: self.enabled.contains(&def.id),
            })
            .collect()
    }

    /// Add a new server definition.
    pub fn add(&mut self, definition: ServerDefinition, enabled: bool) -> Result<(), RegistryError> {
        definition.validate().map_err(RegistryError::Invalid)?;

        if self.get(&definition.id).is_some() {
            return Err(RegistryError::Duplicate(definition.id));
        }

        if enabled {
            self.enabled.insert(definition.id.clone());
        }
        self.servers.push(definition);
        Ok(())
    }

    /// Remove a server definition, returning it.
    pub fn remove(&mut self, id: &str) -> Result<ServerDefinition, RegistryError> {
        let index = self
            .servers
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        self.enabled.remove(id);
        Ok(self.servers.remove(index))
    }

    /// Replace the definition with the same id, returning the previous one.
    ///
    /// The enabled flag is preserved.
    pub fn update(&mut self, definition: ServerDefinition) -> Result<ServerDefinition, RegistryError> {
        definition.validate().map_err(RegistryError::Invalid)?;

        let slot = self
            .servers
            .iter_mut()
            .find(|s| s.id == definition.id)
            .ok_or_else(|| RegistryError::NotFound(definition.id.clone()))?;
        Ok(std::mem::replace(slot, definition))
    }

    /// Set the enabled flag of a server.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        if self.get(id).is_none() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        if enabled {
            self.enabled.insert(id.to_string());
        } else {
            self.enabled.remove(id);
        }
        Ok(())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.enabled.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&ServerDefinition> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// All definitions in insertion order.
    pub fn definitions(&self) -> &[ServerDefinition] {
        &self.servers
    }

    /// Enabled definitions in insertion order.
    pub fn enabled_servers(&self) -> Vec<ServerDefinition> {
        self.servers
            .iter()
            .filter(|s| self.enabled.contains(&s.id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
