use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::model::LegacyDataflow;
use crate::model::target::{BlockPosition, BlockRelation, NewBlock, VersionUpdate};
use crate::translate::catalog::DefaultsCatalog;
use crate::translate::context::TransformContext;
use crate::translate::expander::{Expander, PlannedBlock, Segment};
use crate::translate::populate::{fill_from_fields, fill_from_transform, variable_bindings};
use crate::translate::type_table::TypeTable;

pub const POSITION_STEP: i64 = 320;
pub const FALLBACK_CRON: &str = "0 0/5 * * * ?";
pub const VERSION_TAG: &str = "migration";
pub const SUCCESS_EXPRESSION: &str = "isSuccess()";
const RELATION_PREFIX: &str = "rel_";
const RELATION_ID_LEN: usize = 10;

/// Builds the new block graph for a legacy dataflow.
pub struct Translator<'a> {
    table: &'a TypeTable,
    catalog: &'a dyn DefaultsCatalog,
}

impl<'a> Translator<'a> {
    pub fn new(table: &'a TypeTable, catalog: &'a dyn DefaultsCatalog) -> Self {
        Self { table, catalog }
    }

    /// Blocks in final order with config, positions and relations filled in.
    ///
    /// A dataflow with exactly one transform block has it replaced by three blocks.
    /// `context` supplies their config; without it they take the transform block's fields.
    pub fn translate(&self, dataflow: &LegacyDataflow, context: Option<&TransformContext>) -> Vec<NewBlock> {
        // 0. Expand
        let transform = dataflow.transform_block();
        if transform.is_none() && dataflow.transform_blocks().count() > 1 {
            warn!(dataflow = %dataflow.name, "Multiple transform blocks found, translating without expansion");
        }
        let segments = Expander::new(self.table).expand(dataflow, transform);

        // 1. Link: inside a segment block i -> i+1, between segments exit -> next entry
        let mut successors: Vec<Option<String>> = Vec::new();
        for (idx, segment) in segments.iter().enumerate() {
            successors.extend(segment.blocks.windows(2).map(|pair| Some(pair[1].name.clone())));
            if segment.exit().is_some() {
                let next_entry = segments.get(idx + 1).and_then(Segment::entry);
                successors.push(next_entry.map(|b| b.name.clone()));
            }
        }

        // 2. Materialize in final order
        let planned = segments.iter().flat_map(|s| s.blocks.iter());
        let blocks: Vec<NewBlock> = planned
            .zip(successors)
            .enumerate()
            .map(|(idx, (block, successor))| self.build_block(block, idx, successor, context))
            .collect();

        info!(dataflow = %dataflow.name, blocks = blocks.len(), expanded = transform.is_some(), "Translated dataflow");
        blocks
    }

    /// Full payload for the version update call.
    pub fn version_update(&self, dataflow: &LegacyDataflow, context: Option<&TransformContext>) -> VersionUpdate {
        VersionUpdate {
            blocks: self.translate(dataflow, context),
            schedule: schedule_cron(dataflow),
            tag: VERSION_TAG.to_string(),
        }
    }

    fn build_block(&self, planned: &PlannedBlock, index: usize, successor: Option<String>, context: Option<&TransformContext>) -> NewBlock {
        let fields = &planned.origin.fields;
        let mut config = self.catalog.defaults(&planned.kind);
        if config.is_empty() {
            debug!(block = %planned.name, block_type = %planned.kind, "No catalog defaults for block type");
        }

        match (planned.part, context) {
            (Some(part), Some(ctx)) => fill_from_transform(&mut config, part, ctx),
            _ => fill_from_fields(&mut config, fields),
        }
        let variable_bindings = variable_bindings(&config, fields);

        NewBlock {
            name: planned.name.clone(),
            kind: planned.kind.clone(),
            is_source: planned.is_source,
            config,
            variable_bindings,
            position: BlockPosition {
                x: index as i64 * POSITION_STEP,
                y: 0,
            },
            relations: successor.map(success_relation).into_iter().collect(),
        }
    }
}

/// Relation firing when the upstream block succeeds.
pub fn success_relation(to: String) -> BlockRelation {
    BlockRelation {
        name: relation_name(),
        expression: SUCCESS_EXPRESSION.to_string(),
        status: Vec::new(),
        to,
    }
}

/// `rel_` followed by ten hex characters.
pub fn relation_name() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", RELATION_PREFIX, &hex[..RELATION_ID_LEN])
}

/// Legacy cron, else the legacy schedule expression, else every five minutes.
pub fn schedule_cron(dataflow: &LegacyDataflow) -> String {
    let Some(schedule) = &dataflow.schedule else {
        return FALLBACK_CRON.to_string();
    };
    if let Some(cron) = schedule.cron.as_deref().filter(|c| !c.trim().is_empty()) {
        return cron.to_string();
    }
    schedule
        .schedule_expression
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(FALLBACK_CRON)
        .to_string()
}

/// Block name -> outgoing target, for inspecting a translated graph.
pub fn edges(blocks: &[NewBlock]) -> IndexMap<&str, Option<&str>> {
    blocks
        .iter()
        .map(|b| (b.name.as_str(), b.relations.first().map(|r| r.to.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_name_shape() {
        let name = relation_name();
        assert_eq!(name.len(), 14);
        assert!(name.starts_with("rel_"));
        assert!(name[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
