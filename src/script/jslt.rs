use crate::error::Result;
use crate::script::parse_mapping;

const CONST_PREFIX: &str = "const{";
const EXP_PREFIX: &str = "exp{";
const HDR_PREFIX: &str = "hdr{";

/// Prefixes of mapping values that are not plain source-field references.
const DERIVED_PREFIXES: [&str; 5] = ["exp{", "const{", "hdr{", "sum{", "avg{"];

/// Reformatting applied to the mapping entry whose output key is `output_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pub output_key: String,
    pub existing: String,
    pub target: String,
    pub timezone: Option<String>,
}

impl DateFormat {
    pub fn new(output_key: &str, existing: &str, target: &str) -> Self {
        Self {
            output_key: output_key.to_string(),
            existing: existing.to_string(),
            target: target.to_string(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string()).filter(|t| !t.is_empty());
        self
    }

    /// `format-time(parse-time(expr, "from"[, "tz"]), "to"[, "tz"])`
    fn wrap(&self, expr: &str) -> String {
        let tz = self
            .timezone
            .as_deref()
            .map(|t| format!(", {}", quote_string(t)))
            .unwrap_or_default();
        format!(
            "format-time(parse-time({}, {}{}), {}{})",
            expr,
            quote_string(&self.existing),
            tz,
            quote_string(&self.target),
            tz
        )
    }
}

/// Compiles a header mapping into a JSLT object literal, one entry per mapping key.
///
/// Values are either `const{literal}`, `exp{hdr{field} + 'suffix' ...}`, or a bare
/// source field name. Empty values and expressions without a field reference become `null`.
pub fn generate(mapping_json: &str, date: Option<&DateFormat>) -> Result<String> {
    let mapping = parse_mapping(mapping_json)?;

    let entries: Vec<String> = mapping
        .iter()
        .map(|(output_key, value)| {
            let date = date.filter(|d| d.output_key == *output_key);
            let expr = value
                .as_deref()
                .and_then(|v| value_to_expr(v, date))
                .unwrap_or_else(|| "null".to_string());
            format!("  {}: {}", quote_key(output_key), expr)
        })
        .collect();

    let mut script = String::from("{\n");
    if !entries.is_empty() {
        script.push_str(&entries.join(",\n"));
        script.push('\n');
    }
    script.push('}');
    Ok(script)
}

fn value_to_expr(value: &str, date: Option<&DateFormat>) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    if let Some(literal) = v.strip_prefix(CONST_PREFIX).and_then(|rest| rest.strip_suffix('}')) {
        if !literal.contains('}') {
            return Some(quote_string(literal));
        }
    }

    if let Some(rest) = v.strip_prefix(EXP_PREFIX) {
        let inner = rest.strip_suffix('}').unwrap_or(rest).trim();
        let expr = exp_to_expr(inner)?;
        return Some(match date {
            Some(d) => d.wrap(&expr),
            None => expr,
        });
    }

    let selector = selector(v);
    Some(match date {
        Some(d) => d.wrap(&selector),
        None => selector,
    })
}

/// First `hdr{field}` reference, followed by every non-empty `+ '...'` literal
/// concatenated into one string.
fn exp_to_expr(inner: &str) -> Option<String> {
    let start = inner.find(HDR_PREFIX)? + HDR_PREFIX.len();
    let len = inner[start..].find('}')?;
    let field = inner[start..start + len].trim();
    if len == 0 {
        return None;
    }
    let field_selector = selector(field);

    let mut literals = String::new();
    let mut rest = inner;
    while let Some(plus) = rest.find('+') {
        let after_plus = &rest[plus + 1..];
        let Some(open) = after_plus.find('\'') else {
            break;
        };
        let quoted = &after_plus[open + 1..];
        let Some(close) = quoted.find('\'') else {
            break;
        };
        literals.push_str(&quoted[..close]);
        rest = &quoted[close + 1..];
    }

    if literals.is_empty() {
        Some(field_selector)
    } else {
        Some(format!("{} + {}", field_selector, quote_string(&literals)))
    }
}

/// `.name` for identifier-like names, `get-key(., "name")` otherwise.
pub fn selector(field: &str) -> String {
    if is_identifier(field) {
        format!(".{}", field)
    } else {
        format!("get-key(., {})", quote_string(field))
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

fn quote_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{}\"", escaped)
}

fn quote_key(key: &str) -> String {
    format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Rewrites a comma-separated group-by list from output names to source names.
///
/// Names absent from the mapping are kept as-is. Names mapped to a constant,
/// expression or aggregate are dropped.
pub fn resolve_group_by(names: &str, mapping_json: &str) -> Result<String> {
    if names.trim().is_empty() {
        return Ok(names.to_string());
    }
    let mapping = parse_mapping(mapping_json)?;

    let resolved: Vec<&str> = names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .filter_map(|name| match mapping.get(name).and_then(|v| v.as_deref()) {
            None => Some(name),
            Some(source) if is_simple_field(source) => Some(source.trim()),
            Some(_) => None,
        })
        .collect();

    Ok(resolved.join(","))
}

fn is_simple_field(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !DERIVED_PREFIXES.iter().any(|p| v.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_without_field_reference_is_none() {
        assert_eq!(exp_to_expr("'a' + 'b'"), None);
        assert_eq!(exp_to_expr("hdr{}"), None);
    }

    #[test]
    fn test_exp_skips_empty_literals() {
        assert_eq!(exp_to_expr("hdr{id} + '' + 'x'"), Some(".id + \"x\"".to_string()));
    }

    #[test]
    fn test_quote_string_escapes_control_chars() {
        assert_eq!(quote_string("a\"b\\c\nd\re"), "\"a\\\"b\\\\c\\nd\\re\"");
    }
}
