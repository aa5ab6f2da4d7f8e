use indexmap::IndexMap;
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Ordered config of a new-system block; key order follows the type's default schema.
pub type BlockConfig = IndexMap<String, Value>;

/// A block of the migrated dataflow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBlock {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "source")]
    pub is_source: bool,
    pub config: BlockConfig,
    /// Config key -> variable key, for values resolved at deploy time.
    #[serde(rename = "variableConfigKeyMap")]
    pub variable_bindings: IndexMap<String, String>,
    pub position: BlockPosition,
    pub relations: Vec<BlockRelation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockPosition {
    pub x: i64,
    pub y: i64,
}

/// Outgoing edge of a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockRelation {
    pub name: String,
    pub expression: String,
    pub status: Vec<String>,
    pub to: String,
}

/// Payload replacing the blocks and schedule of a draft version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionUpdate {
    pub blocks: Vec<NewBlock>,
    pub schedule: String,
    pub tag: String,
}

/// Instruction to raise the concurrency of one processor of a migrated block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyUpdate {
    #[serde(rename = "neoDataflowId")]
    pub dataflow_id: String,
    #[serde(rename = "neoVersionId")]
    pub version_id: String,
    pub block_type: String,
    pub block_id: String,
    pub block_name: String,
    pub processor_type: String,
    #[serde(rename = "concurrentlySchedulableTaskCount")]
    pub concurrency: i64,
}
