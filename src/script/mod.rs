//! Header-mapping compiler and transform-spec analysis.

pub mod jolt;
pub mod jslt;

use indexmap::IndexMap;
use serde_json::Value;
use crate::error::{MigrateError, Result};

pub use jolt::{InputShape, classify};
pub use jslt::{DateFormat, generate, resolve_group_by};

/// Ordered header mapping: output field name -> source expression.
/// `None` marks an entry with no usable source value.
pub type HeaderMapping = IndexMap<String, Option<String>>;

/// Parses the header-rename mapping JSON, keeping key order.
/// Scalars are taken as text; nulls, objects and arrays have no usable value.
pub fn parse_mapping(mapping_json: &str) -> Result<HeaderMapping> {
    let raw: IndexMap<String, Value> = serde_json::from_str(mapping_json).map_err(MigrateError::MappingJson)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            (key, text)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::parse_mapping;

    #[test]
    fn test_parse_mapping_keeps_order_and_scalars() {
        let mapping = parse_mapping(r#"{"z":"a","y":3,"x":null,"w":{"k":1}}"#).unwrap();
        let keys: Vec<&str> = mapping.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "y", "x", "w"]);
        assert_eq!(mapping["y"].as_deref(), Some("3"));
        assert_eq!(mapping["x"], None);
        assert_eq!(mapping["w"], None);
    }

    #[test]
    fn test_parse_mapping_rejects_non_object() {
        assert!(parse_mapping("[1,2]").is_err());
        assert!(parse_mapping("not json").is_err());
    }
}
