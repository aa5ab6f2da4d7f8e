use std::sync::Arc;
use dashmap::DashMap;
use tracing::{debug, warn};
use crate::cipher::{Cipher, decrypt_value};
use crate::client::BlockDefinitionLookup;
use crate::flowxml::{Element, FlowTree, processors};
use crate::model::{BlockDefinition, LegacyDataflow};

/// Block-type definitions fetched during one run, keyed by block type id.
/// Only successful lookups are kept.
#[derive(Default)]
pub struct DefinitionCache {
    entries: DashMap<i64, Arc<BlockDefinition>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn get_or_fetch(&self, lookup: &dyn BlockDefinitionLookup, block_type_id: i64) -> Option<Arc<BlockDefinition>> {
        let cached = self.entries.get(&block_type_id).map(|d| d.clone());
        if cached.is_some() {
            return cached;
        }
        match lookup.block_definition(block_type_id).await {
            Ok(def) => {
                let def = Arc::new(def);
                self.entries.insert(block_type_id, def.clone());
                Some(def)
            }
            Err(e) => {
                warn!(block_type_id, error = %e, "Unable to fetch block definition");
                None
            }
        }
    }
}

/// Recovers masked field values from the flow export.
pub struct SecretResolver {
    lookup: Arc<dyn BlockDefinitionLookup>,
    cipher: Arc<dyn Cipher>,
    cache: DefinitionCache,
}

impl SecretResolver {
    pub fn new(lookup: Arc<dyn BlockDefinitionLookup>, cipher: Arc<dyn Cipher>) -> Self {
        Self {
            lookup,
            cipher,
            cache: DefinitionCache::new(),
        }
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    /// Replaces masked values on `dataflow` in place. A dataflow without a process group
    /// in the export is left untouched.
    pub async fn resolve(&self, tree: &FlowTree, dataflow: &mut LegacyDataflow, dataflow_uuid: &str) {
        let Some(group) = tree.process_group(dataflow_uuid) else {
            warn!(dataflow = %dataflow.name, uuid = dataflow_uuid, "Dataflow not found in flow export");
            return;
        };

        for block in dataflow.blocks.iter_mut() {
            let Some(def) = self.cache.get_or_fetch(self.lookup.as_ref(), block.block_type_id).await else {
                continue;
            };
            for field in block.fields.iter_mut().filter(|f| f.is_masked()) {
                let Some(field_name) = field.name.as_deref() else {
                    continue;
                };
                if let Some(raw) = find_field_value(group, &block.name, &def, field_name) {
                    debug!(block = %block.name, field = field_name, "Recovered masked field");
                    field.value = Some(decrypt_value(self.cipher.as_ref(), &raw));
                }
            }
        }
    }
}

/// Looks up the stored value of `field_name` for `block` via its definition.
fn find_field_value(group: &Element, block_name: &str, def: &BlockDefinition, field_name: &str) -> Option<String> {
    let field_id = def
        .ui_fields
        .iter()
        .find(|f| f.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(field_name)))
        .and_then(|f| f.id)?;

    for processor_def in &def.processors {
        let Some(processor_id) = processor_def.id else {
            continue;
        };
        let processor_name = format!("{}_{}", block_name, processor_id);
        for mapping in processor_def.properties.iter().filter(|m| m.field_id == Some(field_id)) {
            let Some(key) = mapping.nifi_key.as_deref() else {
                continue;
            };
            if let Some(value) = find_processor_property(group, &processor_name, key) {
                return Some(value);
            }
        }
    }
    None
}

fn find_processor_property(group: &Element, processor_name: &str, property_key: &str) -> Option<String> {
    let target = property_key.rsplit('.').next().unwrap_or(property_key);
    processors(group)
        .into_iter()
        .filter(|p| p.name().is_some_and(|n| n.starts_with(processor_name)))
        .find_map(|p| p.property_ignore_case(target).map(|v| v.to_string()))
}

