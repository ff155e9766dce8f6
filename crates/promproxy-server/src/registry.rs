//! Typed metric registry.
//!
//! The registry is the table every command executes against: it maps metric
//! names to their descriptors and realized handles, and enforces the two
//! invariants the protocol promises - a name is unique across all kinds,
//! and its kind never changes after first registration. Entries are never
//! removed.
//!
//! One registry is created per server instance and shared by every
//! connection; nothing here is process-global, so tests can run any number
//! of isolated registries side by side.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::descriptor::MetricDescriptor;
use crate::engine::{Engine, MetricHandle};
use crate::error::Error;

struct RegistryEntry {
    descriptor: MetricDescriptor,
    handle: MetricHandle,
}

/// The name -> (descriptor, handle) table, guarded for concurrent use.
pub struct MetricRegistry {
    namespace: String,
    engine: Engine,
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl MetricRegistry {
    /// Create a registry with its own engine. The namespace may be empty,
    /// in which case metric names are exposed unprefixed.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_engine(namespace, Engine::new())
    }

    /// Create a registry over an existing engine.
    pub fn with_engine(namespace: impl Into<String>, engine: Engine) -> Self {
        Self {
            namespace: namespace.into(),
            engine,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The namespace metric names are prefixed with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a metric.
    ///
    /// A name seen for the first time is realized through the engine and
    /// inserted. Re-registration with the same kind is a no-op success and
    /// the original registration stands. Re-registration with a different
    /// kind fails with [`Error::KindConflict`] and leaves the registry
    /// unchanged.
    pub fn register(&self, descriptor: MetricDescriptor) -> Result<(), Error> {
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(&descriptor.name) {
            if existing.descriptor.kind() == descriptor.kind() {
                return Ok(());
            }
            return Err(Error::KindConflict {
                existing: existing.descriptor.kind(),
                requested: descriptor.kind(),
                name: descriptor.name,
            });
        }

        // Realization stays inside the write lock so concurrent registers
        // of the same name create the underlying vector at most once.
        let handle = self.engine.realize(&self.namespace, &descriptor)?;
        entries.insert(
            descriptor.name.clone(),
            RegistryEntry { descriptor, handle },
        );
        Ok(())
    }

    /// Record an observation against a registered metric.
    ///
    /// The shared lock covers only the handle lookup; the engine applies
    /// the observation with its own internal synchronization.
    pub fn record(
        &self,
        name: &str,
        labels: &[(String, String)],
        value: f64,
    ) -> Result<(), Error> {
        let handle = {
            let entries = self.entries.read();
            match entries.get(name) {
                Some(entry) => entry.handle.clone(),
                None => return Err(Error::NotRegistered(name.to_string())),
            }
        };

        let label_map: HashMap<&str, &str> = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        handle.record(&label_map, value)
    }

    /// Gather the exposition text for every registered metric.
    pub fn fetch(&self) -> Result<String, Error> {
        self.engine.gather()
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
