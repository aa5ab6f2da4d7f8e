use std::fs;
use std::path::Path;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use crate::error::{MigrateError, Result};
use crate::model::target::BlockConfig;

/// Default config of a new block type, in schema order.
pub trait DefaultsCatalog: Send + Sync {
    /// Empty for unknown types.
    fn defaults(&self, block_type: &str) -> BlockConfig;
}

#[derive(Debug, Deserialize)]
struct RuleMeta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    config: Option<RuleMetaConfig>,
}

#[derive(Debug, Deserialize)]
struct RuleMetaConfig {
    #[serde(default)]
    properties: IndexMap<String, PropertySchema>,
}

#[derive(Debug, Deserialize)]
struct PropertySchema {
    #[serde(default)]
    default: Value,
}

/// Defaults catalog read from the new system's block-type metadata export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigCatalog {
    types: IndexMap<String, BlockConfig>,
}

impl ConfigCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let metas: Vec<RuleMeta> = serde_json::from_str(json).map_err(MigrateError::Catalog)?;
        let types = metas
            .into_iter()
            .filter_map(|meta| {
                let id = meta.id?;
                let defaults: BlockConfig = meta
                    .config
                    .map(|c| c.properties.into_iter().map(|(k, p)| (k, p.default)).collect())
                    .unwrap_or_default();
                Some((id, defaults))
            })
            .collect();
        Ok(Self { types })
    }

    /// Reads the catalog file. An unreadable or malformed file yields an empty catalog,
    /// leaving every migrated block with an empty config.
    pub fn load(path: &Path) -> Self {
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Self::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(catalog) => {
                info!(path = %path.display(), block_types = catalog.len(), "Loaded block catalog");
                catalog
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load block catalog");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DefaultsCatalog for ConfigCatalog {
    fn defaults(&self, block_type: &str) -> BlockConfig {
        self.types.get(block_type).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_property_order() {
        let catalog = ConfigCatalog::from_json(
            r#"[{"id":"sftp_read","config":{"properties":{"host":{"default":"h"},"port":{"default":22},"flag":{}}}},
                {"config":{"properties":{"x":{"default":1}}}}]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        let defaults = catalog.defaults("sftp_read");
        let keys: Vec<&str> = defaults.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["host", "port", "flag"]);
        assert_eq!(defaults["port"], json!(22));
        assert_eq!(defaults["flag"], Value::Null);
        assert!(catalog.defaults("unknown").is_empty());
    }
}
