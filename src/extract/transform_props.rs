use tracing::warn;
use crate::flowxml::{FlowTree, Processor, processors};

const RENAME_HEADERS_MAPPING: &str = "Rename Headers Mapping";
const DATE_COLUMN_HEADER: &str = "Date Column Header";
const EXISTING_DATE_FORMAT: &str = "Existing Date Format";
const NEW_DATE_FORMAT: &str = "New Date Format";
const RECORD_GROUP_BY: &str = "Record Group By";
const MINIMUM_GROUP_RECORD: &str = "Minimum Group Record";
const RECORDS_PER_SPLIT: &str = "Records Per Split";
const SORT_HEADERS: &str = "Sort Headers";
const USE_ALPHABETICAL_SORT: &str = "Use Alphabetical Sort";
const JOLT_SPECIFICATION: &str = "jolt-spec";
const LINE_NOS: &str = "lineNos";

const ATTRIBUTION_TYPE_KEYS: [&str; 2] = ["attribution_type", "attributionType"];
const ATTRIBUTION_CODE_KEYS: [&str; 2] = ["attribution_code", "attributionCode"];
const HEADER_VALUE_KEYS: [&str; 2] = ["header_value", "headerValue"];
const CHILD_TILL_CODE_KEYS: [&str; 2] = ["child_till_code", "childTillCode"];
const CHILD_ORG_ID_KEYS: [&str; 2] = ["child_org_id", "childOrgId"];

/// Records-per-split values at or above this are batch sizes, not group sizes.
const RECORDS_PER_SPLIT_MAX: i64 = 100;

/// Transform-related properties harvested from a dataflow's processors.
/// All fields are trimmed and non-empty when set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformProperties {
    pub header_mapping_json: Option<String>,
    pub date_column_output_key: Option<String>,
    pub existing_date_format: Option<String>,
    pub new_date_format: Option<String>,
    /// Not present in the export; set by callers that know the source timezone.
    pub timezone_id: Option<String>,
    pub record_group_by: Option<String>,
    pub group_size: Option<String>,
    pub sort_headers: Option<String>,
    pub alphabetical_sort: Option<String>,
    pub jolt_spec: Option<String>,
    pub line_nos: Option<String>,
    pub attribution_type: Option<String>,
    pub attribution_code: Option<String>,
    pub header_value: Option<String>,
    pub child_till_code: Option<String>,
    pub child_org_id: Option<String>,
}

/// Scans the dataflow's processors, optionally only those named with `block_name_prefix`.
/// Later processors overwrite values found on earlier ones.
pub fn extract(tree: &FlowTree, dataflow_uuid: &str, block_name_prefix: Option<&str>) -> TransformProperties {
    let mut out = TransformProperties::default();
    let Some(group) = tree.process_group(dataflow_uuid) else {
        warn!(uuid = dataflow_uuid, "Dataflow process group not found in flow export");
        return out;
    };

    let prefix = block_name_prefix.filter(|p| !p.is_empty());
    let mut smallest_split: Option<i64> = None;

    for processor in processors(group) {
        if let Some(prefix) = prefix {
            if !processor.name().is_some_and(|n| n.starts_with(prefix)) {
                continue;
            }
        }
        let props = PropertyView(processor);

        if props.has(RENAME_HEADERS_MAPPING) {
            set_if_present(&mut out.header_mapping_json, props.value(RENAME_HEADERS_MAPPING));
            set_if_present(&mut out.date_column_output_key, props.value(DATE_COLUMN_HEADER));
            set_if_present(&mut out.existing_date_format, props.value(EXISTING_DATE_FORMAT));
            set_if_present(&mut out.new_date_format, props.value(NEW_DATE_FORMAT));
        }
        set_if_present(&mut out.record_group_by, props.value(RECORD_GROUP_BY));
        set_if_present(&mut out.group_size, props.value(MINIMUM_GROUP_RECORD));
        set_if_present(&mut out.sort_headers, props.value(SORT_HEADERS));
        set_if_present(&mut out.alphabetical_sort, props.value(USE_ALPHABETICAL_SORT));
        set_if_present(&mut out.jolt_spec, props.value(JOLT_SPECIFICATION));
        set_if_present(&mut out.line_nos, props.value(LINE_NOS));

        if let Some(split) = props.value(RECORDS_PER_SPLIT).and_then(|v| v.parse::<i64>().ok()) {
            if (0..RECORDS_PER_SPLIT_MAX).contains(&split) && smallest_split.is_none_or(|s| split < s) {
                smallest_split = Some(split);
            }
        }

        set_if_present(&mut out.attribution_type, props.first_of(&ATTRIBUTION_TYPE_KEYS));
        set_if_present(&mut out.attribution_code, props.first_of(&ATTRIBUTION_CODE_KEYS));
        set_if_present(&mut out.header_value, props.first_of(&HEADER_VALUE_KEYS));
        set_if_present(&mut out.child_till_code, props.first_of(&CHILD_TILL_CODE_KEYS));
        set_if_present(&mut out.child_org_id, props.first_of(&CHILD_ORG_ID_KEYS));
    }

    if out.group_size.is_none() {
        out.group_size = smallest_split.map(|s| s.to_string());
    }
    out
}

fn set_if_present(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(v) = value {
        *slot = Some(v.to_string());
    }
}

/// Exact-name property access over one processor.
struct PropertyView<'a>(Processor<'a>);

impl<'a> PropertyView<'a> {
    fn has(&self, name: &str) -> bool {
        self.0.properties().any(|(n, _)| n.trim() == name)
    }

    /// Trimmed value of `name`, `None` when absent or blank.
    fn value(&self, name: &str) -> Option<&'a str> {
        self.0
            .properties()
            .find(|(n, _)| n.trim() == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn first_of(&self, names: &[&str]) -> Option<&'a str> {
        names.iter().find_map(|n| self.value(n))
    }
}
