use crate::model::{LegacyBlock, LegacyDataflow};
use crate::translate::type_table::TypeTable;

pub const CSV_TO_JSON_TYPE: &str = "convert_csv_to_json";
pub const JSLT_TYPE: &str = "jslt_transform";
pub const JOLT_TYPE: &str = "jolt_transform";

/// Number of extra blocks a transform block expands into.
const EXPANSION_GROWTH: i32 = 2;

/// Which of the three replacement blocks a planned block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPart {
    Csv,
    Jslt,
    Jolt,
}

/// A new block before config and relations are filled in.
#[derive(Debug, Clone)]
pub struct PlannedBlock<'a> {
    pub name: String,
    pub kind: String,
    pub order: i32,
    pub is_source: bool,
    pub origin: &'a LegacyBlock,
    pub part: Option<TransformPart>,
}

/// The blocks one legacy block turns into, linked in sequence.
/// Incoming edges land on the entry, the outgoing edge leaves the exit.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub blocks: Vec<PlannedBlock<'a>>,
}

impl<'a> Segment<'a> {
    fn single(block: PlannedBlock<'a>) -> Self {
        Self { blocks: vec![block] }
    }

    pub fn order(&self) -> i32 {
        self.blocks.first().map(|b| b.order).unwrap_or_default()
    }

    pub fn entry(&self) -> Option<&PlannedBlock<'a>> {
        self.blocks.first()
    }

    pub fn exit(&self) -> Option<&PlannedBlock<'a>> {
        self.blocks.last()
    }
}

pub struct Expander<'t> {
    table: &'t TypeTable,
}

impl<'t> Expander<'t> {
    pub fn new(table: &'t TypeTable) -> Self {
        Self { table }
    }

    /// Plans the new block sequence, sorted by final order.
    ///
    /// When `transform` names a block, it becomes a csv -> jslt -> jolt segment at
    /// orders `T..=T+2` and every block ordered after it moves up by two.
    pub fn expand<'a>(&self, dataflow: &'a LegacyDataflow, transform: Option<&'a LegacyBlock>) -> Vec<Segment<'a>> {
        let transform_order = transform.map(|t| t.order);
        let mut segments = Vec::with_capacity(dataflow.blocks.len());

        for block in &dataflow.blocks {
            if transform.is_some_and(|t| std::ptr::eq(t, block)) {
                segments.push(self.expand_transform(block));
                continue;
            }
            let order = match transform_order {
                Some(t) if block.order > t => block.order + EXPANSION_GROWTH,
                _ => block.order,
            };
            segments.push(Segment::single(PlannedBlock {
                name: block.name.clone(),
                kind: self.table.map(&block.kind).to_string(),
                order,
                is_source: block.is_source,
                origin: block,
                part: None,
            }));
        }

        segments.sort_by_key(|s| s.order());
        segments
    }

    fn expand_transform<'a>(&self, block: &'a LegacyBlock) -> Segment<'a> {
        let order = block.order;
        let planned = |suffix: &str, kind: &str, offset: i32, is_source: bool, part: TransformPart| PlannedBlock {
            name: format!("{}-{}", block.name, suffix),
            kind: kind.to_string(),
            order: order + offset,
            is_source,
            origin: block,
            part: Some(part),
        };

        Segment {
            blocks: vec![
                planned("csv", self.table.map(CSV_TO_JSON_TYPE), 0, block.is_source, TransformPart::Csv),
                planned("jslt", JSLT_TYPE, 1, false, TransformPart::Jslt),
                planned("jolt", JOLT_TYPE, 2, false, TransformPart::Jolt),
            ],
        }
    }
}
