//! Pluggable per-import-type contract
//!
//! Each import type supplies its expected columns, row validation, and the
//! persist operation for accepted rows. Modules are looked up by type id at
//! cycle start.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{FieldMap, ImportRecord};

/// Capability interface implemented once per import type.
#[async_trait]
pub trait ImportModule: Send + Sync {
    /// Stable identifier persisted on import records.
    fn type_id(&self) -> i16;

    /// Human-readable module name for logs.
    fn name(&self) -> &str;

    /// Normalized header columns the submitted file must contain.
    fn expected_columns(&self) -> &[&str];

    /// Validate one assembled row. Returns zero or more human-readable
    /// errors; any error marks the row failed without aborting the cycle.
    fn validate(&self, fields: &FieldMap) -> Vec<String>;

    /// Persist one accepted row. A raised error is fatal to the cycle.
    async fn save(&self, fields: &FieldMap, record: &ImportRecord) -> anyhow::Result<()>;
}

/// Registry of import modules keyed by type id.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<i16, Arc<dyn ImportModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own type id. The last registration for a
    /// type id wins.
    pub fn register(mut self, module: Arc<dyn ImportModule>) -> Self {
        self.modules.insert(module.type_id(), module);
        self
    }

    pub fn by_type(&self, type_id: i16) -> Option<Arc<dyn ImportModule>> {
        self.modules.get(&type_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
