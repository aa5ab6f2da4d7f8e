use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Root input a Jolt spec is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputShape {
    Object,
    Array,
    Unknown,
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputShape::Object => "OBJECT",
            InputShape::Array => "ARRAY",
            InputShape::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Infers the expected input shape from the first `shift` operation of a Jolt spec.
///
/// A shift spec whose top level iterates `*` or numeric indices expects an array.
pub fn classify(spec_json: &str) -> InputShape {
    let trimmed = spec_json.trim();
    if trimmed.is_empty() {
        return InputShape::Unknown;
    }
    let Ok(root) = serde_json::from_str::<Value>(trimmed) else {
        return InputShape::Unknown;
    };

    let shift_spec = match &root {
        Value::Array(ops) => ops.iter().find_map(shift_spec_of),
        Value::Object(_) => shift_spec_of(&root),
        _ => None,
    };

    match shift_spec {
        Some(spec) if spec.keys().any(|k| k == "*" || is_index(k)) => InputShape::Array,
        Some(_) => InputShape::Object,
        None => InputShape::Unknown,
    }
}

fn shift_spec_of(op: &Value) -> Option<&serde_json::Map<String, Value>> {
    if op.get("operation")?.as_str()? != "shift" {
        return None;
    }
    op.get("spec")?.as_object()
}

fn is_index(key: &str) -> bool {
    let digits = key.strip_prefix('-').unwrap_or(key);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
