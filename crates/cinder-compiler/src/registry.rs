//! Persistent top-level variables.

use cinder_eval::{FieldHandle, Type};
use indexmap::IndexMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RegisteredField {
    pub handle: FieldHandle,
    pub readonly: bool,
}

impl RegisteredField {
    pub fn ty(&self) -> &Type {
        self.handle.ty()
    }
}

/// Name → latest storage handle. Display order is first declaration.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, RegisteredField>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `name`, releasing any previous handle first.
    pub fn register(&mut self, name: &str, handle: FieldHandle, readonly: bool) {
        let field = RegisteredField { handle, readonly };
        match self.fields.get_mut(name) {
            Some(previous) => {
                info!(name, old = %previous.ty(), new = %field.ty(), "redefining variable");
                previous.handle.release();
                *previous = field;
            }
            None => {
                self.fields.insert(name.to_string(), field);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredField> {
        self.fields.get(name)
    }

    /// Number of live (unreleased) handles held for `name`: 0 or 1.
    pub fn live_handles(&self, name: &str) -> usize {
        self.fields
            .get(name)
            .filter(|f| !f.handle.is_released())
            .map_or(0, |_| 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
