use std::collections::HashMap;
use std::fs;
use std::path::Path;
use anyhow::Context as AnyhowContext;
use crate::error::{MigrateError, Result};

const BUILTIN_TABLE: &str = include_str!("../../data/type_table.yaml");

/// Legacy block type -> new block type. Unknown types map to themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTable {
    entries: HashMap<String, String>,
}

impl TypeTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_TABLE)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_yaml::from_str(yaml).map_err(MigrateError::TypeTable)?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read type table from {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Failed to parse type table {}", path.display()))
    }

    /// The override file when given, otherwise the builtin table.
    pub fn load_or_builtin(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()?),
        }
    }

    pub fn map<'a>(&'a self, legacy_type: &'a str) -> &'a str {
        self.entries.get(legacy_type).map(String::as_str).unwrap_or(legacy_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
