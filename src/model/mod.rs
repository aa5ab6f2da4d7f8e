pub mod builder;
pub mod target;

use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Prefix identifying the single transform block that gets expanded during migration.
pub const TRANSFORM_TYPE_PREFIX: &str = "transform_to_";

/// Marker separating a variable key from its literal in a bound field value.
pub const VARIABLE_MARKER: &str = "___";

/// A legacy dataflow as returned by the legacy detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDataflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub status: Option<DataflowStatus>,
    #[serde(default)]
    pub blocks: Vec<LegacyBlock>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

impl LegacyDataflow {
    /// Blocks whose legacy type marks them as transform blocks.
    pub fn transform_blocks(&self) -> impl Iterator<Item = &LegacyBlock> {
        self.blocks.iter().filter(|b| b.is_transform())
    }

    /// The single transform block, if exactly one exists.
    pub fn transform_block(&self) -> Option<&LegacyBlock> {
        let mut iter = self.transform_blocks();
        match (iter.next(), iter.next()) {
            (Some(block), None) => Some(block),
            _ => None,
        }
    }

    pub fn is_transform_flow(&self) -> bool {
        self.transform_block().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBlock {
    #[serde(default)]
    pub block_type_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "source", default)]
    pub is_source: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl LegacyBlock {
    pub fn is_transform(&self) -> bool {
        self.kind.starts_with(TRANSFORM_TYPE_PREFIX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub possible_values: Vec<PossibleValue>,
}

impl Field {
    /// Masked values are hidden by the legacy API and must be recovered from the flow export.
    pub fn is_masked(&self) -> bool {
        match &self.value {
            None => true,
            Some(v) => {
                let trimmed = v.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "********"
            }
        }
    }

    /// Variable key when the value has the form `<varKey>___<literal>`.
    pub fn variable_key(&self) -> Option<&str> {
        let value = self.value.as_deref()?;
        value.find(VARIABLE_MARKER).map(|idx| &value[..idx])
    }

    /// True when `config_key` names this field by key or display name, ignoring case.
    pub fn matches(&self, config_key: &str) -> bool {
        let by_key = self.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(config_key));
        let by_name = self.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(config_key));
        by_key || by_name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PossibleValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub schedule_expression: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataflowStatus {
    #[serde(default)]
    pub state: Option<String>,
}

/// Entry of the legacy dataflow listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataflowSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub status: Option<DataflowStatus>,
}

impl DataflowSummary {
    pub fn is_live(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.state.as_deref())
            .is_some_and(|s| s.eq_ignore_ascii_case("live"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Workspace {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub organisations: Vec<Value>,
}

/// Block-type definition served by the definition lookup service.
/// Maps a display field name to the processor property key that stores its value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    #[serde(default)]
    pub ui_fields: Vec<UiField>,
    #[serde(default)]
    pub processors: Vec<ProcessorDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UiField {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProcessorDefinition {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub properties: Vec<PropertyMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMapping {
    #[serde(default)]
    pub field_id: Option<i64>,
    #[serde(default)]
    pub nifi_key: Option<String>,
}
