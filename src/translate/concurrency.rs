use tracing::{info, warn};
use crate::extract::ProcessorConcurrency;
use crate::model::LegacyBlock;
use crate::model::target::{ConcurrencyUpdate, NewBlock};

const LEGACY_INVOKE_HTTP: &str = "org.apache.nifi.processors.standard.InvokeHTTP";
const INVOKE_HTTP_V2: &str = "com.capillary.foundation.processors.InvokeHttpV2";

/// Legacy block owning a processor named `<blockName>` or `<blockName>_<suffix>`.
/// The longest matching block name wins; comparison ignores case.
pub fn owning_block<'a>(blocks: &'a [LegacyBlock], processor_name: &str) -> Option<&'a LegacyBlock> {
    if processor_name.is_empty() {
        return None;
    }
    let processor = processor_name.to_lowercase();
    blocks
        .iter()
        .filter(|b| !b.name.is_empty())
        .filter(|b| {
            let name = b.name.to_lowercase();
            processor == name || processor.starts_with(&format!("{}_", name))
        })
        .max_by_key(|b| b.name.len())
}

/// New-system processor class for a legacy class.
pub fn processor_type(legacy_class: &str) -> &str {
    if legacy_class == LEGACY_INVOKE_HTTP {
        INVOKE_HTTP_V2
    } else {
        legacy_class
    }
}

/// Maps discovered concurrency entries onto the migrated blocks. Entries whose
/// processor has no owning block, or whose block was not migrated, are skipped.
pub fn plan_updates(
    legacy_blocks: &[LegacyBlock],
    new_blocks: &[NewBlock],
    entries: &[ProcessorConcurrency],
    dataflow_id: &str,
    version_id: &str,
) -> Vec<ConcurrencyUpdate> {
    let mut updates = Vec::new();
    for entry in entries {
        let Some(old_block) = owning_block(legacy_blocks, &entry.processor_name) else {
            warn!(processor = %entry.processor_name, class = %entry.processor_class, "No legacy block owns processor, skipping concurrency");
            continue;
        };
        let Some(new_block) = new_blocks.iter().find(|b| b.name == old_block.name) else {
            warn!(processor = %entry.processor_name, block = %old_block.name, "No migrated block with this name, skipping concurrency");
            continue;
        };
        info!(
            processor = %entry.processor_name,
            block = %new_block.name,
            concurrency = entry.concurrency,
            "Planned concurrency update"
        );
        updates.push(ConcurrencyUpdate {
            dataflow_id: dataflow_id.to_string(),
            version_id: version_id.to_string(),
            block_type: new_block.kind.clone(),
            block_id: String::new(),
            block_name: new_block.name.clone(),
            processor_type: processor_type(&entry.processor_class).to_string(),
            concurrency: entry.concurrency,
        });
    }
    updates
}
