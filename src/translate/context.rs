use tracing::{debug, info};
use crate::error::Result;
use crate::extract::TransformProperties;
use crate::script::{DateFormat, InputShape, classify, generate, resolve_group_by};

/// Values overlaid onto the three blocks replacing a transform block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformContext {
    /// Group-by fields rewritten to source header names.
    pub group_by: Option<String>,
    pub script: Option<String>,
    pub jolt_spec: Option<String>,
    pub jolt_input: Option<InputShape>,
    pub group_size: Option<String>,
    pub sort_headers: Option<String>,
    pub alphabetical_sort: Option<String>,
    pub attribution_type: Option<String>,
    pub attribution_code: Option<String>,
    pub header_value: Option<String>,
    pub child_till_code: Option<String>,
    pub child_org_id: Option<String>,
}

impl TransformContext {
    /// Compiles the harvested header mapping. A malformed mapping fails the whole dataflow.
    pub fn build(props: &TransformProperties) -> Result<Self> {
        let mapping = props.header_mapping_json.as_deref().filter(|m| !m.is_empty());

        let script = match mapping {
            Some(m) => {
                let date = date_format(props);
                Some(generate(m, date.as_ref())?)
            }
            None => None,
        };

        let group_by = match (props.record_group_by.as_deref(), mapping) {
            (Some(names), Some(m)) => Some(resolve_group_by(names, m)?),
            _ => None,
        };

        let jolt_input = props.jolt_spec.as_deref().map(classify);
        if let Some(shape) = jolt_input {
            info!(shape = %shape, "Classified existing Jolt spec input");
        }
        debug!(has_script = script.is_some(), group_by = ?group_by, "Built transform context");

        Ok(Self {
            group_by,
            script,
            jolt_spec: props.jolt_spec.clone(),
            jolt_input,
            group_size: props.group_size.clone(),
            sort_headers: props.sort_headers.clone(),
            alphabetical_sort: props.alphabetical_sort.clone(),
            attribution_type: props.attribution_type.clone(),
            attribution_code: props.attribution_code.clone(),
            header_value: props.header_value.clone(),
            child_till_code: props.child_till_code.clone(),
            child_org_id: props.child_org_id.clone(),
        })
    }
}

fn date_format(props: &TransformProperties) -> Option<DateFormat> {
    let key = props.date_column_output_key.as_deref()?;
    let existing = props.existing_date_format.as_deref()?;
    let target = props.new_date_format.as_deref()?;
    let format = DateFormat::new(key, existing, target);
    Some(match props.timezone_id.as_deref() {
        Some(tz) => format.with_timezone(tz),
        None => format,
    })
}
