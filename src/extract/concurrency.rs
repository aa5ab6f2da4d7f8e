use tracing::{info, warn};
use crate::flowxml::{FlowTree, processors};

/// HTTP-call processor classes whose concurrency is always propagated,
/// since the new system's default for them is not 1.
pub const HTTP_PROCESSOR_CLASSES: [&str; 3] = [
    "org.apache.nifi.processors.standard.InvokeHTTP",
    "com.capillary.foundation.processors.InvokeHttpV2",
    "com.capillary.foundation.processors.OAuthClientProcessor",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConcurrency {
    pub processor_name: String,
    pub processor_class: String,
    pub concurrency: i64,
}

/// Processors of the dataflow's group whose concurrency must be carried over:
/// every processor with `maxConcurrentTasks != 1`, plus all allow-listed HTTP processors.
pub fn find_non_unit_concurrency(tree: &FlowTree, dataflow_uuid: &str) -> Vec<ProcessorConcurrency> {
    let Some(group) = tree.process_group(dataflow_uuid) else {
        warn!(uuid = dataflow_uuid, "Dataflow process group not found in flow export");
        return Vec::new();
    };

    let found: Vec<ProcessorConcurrency> = processors(group)
        .into_iter()
        .filter_map(|p| {
            let class = p.class().unwrap_or("");
            let concurrency = parse_concurrency(p.max_concurrent_tasks());
            if concurrency == 1 && !HTTP_PROCESSOR_CLASSES.contains(&class) {
                return None;
            }
            Some(ProcessorConcurrency {
                processor_name: p.name().unwrap_or("").to_string(),
                processor_class: class.to_string(),
                concurrency,
            })
        })
        .collect();

    info!(uuid = dataflow_uuid, count = found.len(), "Scanned processor concurrency");
    found
}

fn parse_concurrency(value: Option<&str>) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::parse_concurrency;

    #[test]
    fn test_unparseable_concurrency_defaults_to_one() {
        assert_eq!(parse_concurrency(None), 1);
        assert_eq!(parse_concurrency(Some("")), 1);
        assert_eq!(parse_concurrency(Some("four")), 1);
        assert_eq!(parse_concurrency(Some(" 4 ")), 4);
    }
}
