use std::collections::HashMap;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use crate::model::Field;
use crate::model::target::BlockConfig;
use crate::translate::context::TransformContext;
use crate::translate::expander::TransformPart;

/// Overlays field values onto the defaults. Each config key takes the field whose key
/// matches it (ignoring case), falling back to a field whose display name matches.
/// Values are coerced to the kind of the default.
pub fn fill_from_fields(config: &mut BlockConfig, fields: &[Field]) {
    let mut by_key: HashMap<String, &str> = HashMap::new();
    let mut by_name: HashMap<String, &str> = HashMap::new();
    for field in fields {
        let Some(value) = field.value.as_deref() else {
            continue;
        };
        if let Some(key) = &field.key {
            by_key.insert(key.to_lowercase(), value);
        }
        if let Some(name) = &field.name {
            by_name.insert(name.to_lowercase(), value);
        }
    }

    for (config_key, current) in config.iter_mut() {
        let lookup = config_key.to_lowercase();
        if let Some(value) = by_key.get(&lookup).or_else(|| by_name.get(&lookup)) {
            *current = coerce(current, value);
        }
    }
}

/// Converts `value` to the scalar kind of `default`.
pub fn coerce(default: &Value, value: &str) -> Value {
    match default {
        Value::Number(_) => parse_number(value),
        Value::Bool(_) => Value::Bool(value.eq_ignore_ascii_case("true")),
        _ => Value::String(value.to_string()),
    }
}

/// Integer, or double when the text has a decimal point; 0 when unparseable.
pub fn parse_number(value: &str) -> Value {
    let parsed = if value.contains('.') {
        value.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        value.parse::<i64>().ok().map(Number::from)
    };
    Value::Number(parsed.unwrap_or_else(|| Number::from(0)))
}

/// Overlays transform-derived values onto one of the replacement blocks.
/// Keys missing from the defaults are never added.
pub fn fill_from_transform(config: &mut BlockConfig, part: TransformPart, ctx: &TransformContext) {
    let mut put = |key: &str, value: Value| {
        if let Some(slot) = config.get_mut(key) {
            *slot = value;
        }
    };
    let text = |v: &Option<String>| v.as_ref().map(|s| Value::String(s.clone()));

    match part {
        TransformPart::Csv => {
            let overlays = [
                ("groupBy", text(&ctx.group_by)),
                ("groupSize", ctx.group_size.as_deref().map(parse_number)),
                ("sortHeaders", text(&ctx.sort_headers)),
                ("alphabeticalSort", ctx.alphabetical_sort.as_deref().map(|v| Value::Bool(v.eq_ignore_ascii_case("true")))),
                ("attribution_type", text(&ctx.attribution_type)),
                ("attribution_code", text(&ctx.attribution_code)),
                ("header_value", text(&ctx.header_value)),
                ("child_till_code", text(&ctx.child_till_code)),
                ("child_org_id", text(&ctx.child_org_id)),
            ];
            for (key, value) in overlays {
                if let Some(value) = value {
                    put(key, value);
                }
            }
        }
        TransformPart::Jslt => {
            if let Some(script) = text(&ctx.script) {
                put("transformation", script);
            }
        }
        TransformPart::Jolt => {
            if let Some(spec) = text(&ctx.jolt_spec) {
                put("joltTransformation", spec);
            }
        }
    }
}

/// Config key -> variable key for every field bound to a variable.
/// A field binds to the first config key matching its key or display name.
pub fn variable_bindings(config: &BlockConfig, fields: &[Field]) -> IndexMap<String, String> {
    let mut bindings = IndexMap::new();
    for field in fields {
        let Some(var_key) = field.variable_key() else {
            continue;
        };
        if let Some(config_key) = config.keys().find(|k| field.matches(k)) {
            bindings.insert(config_key.clone(), var_key.to_string());
        }
    }
    bindings
}
