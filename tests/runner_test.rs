use std::fs;
use std::sync::{Arc, Mutex};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use flow_migrate::cipher::UnconfiguredCipher;
use flow_migrate::client::{BlockDefinitionLookup, LegacyApi, TargetApi};
use flow_migrate::flowxml::FlowTree;
use flow_migrate::flowxml::provider::StaticFlowTree;
use flow_migrate::model::builder::DataflowBuilder;
use flow_migrate::model::target::{ConcurrencyUpdate, VersionUpdate};
use flow_migrate::model::{BlockDefinition, DataflowStatus, DataflowSummary, LegacyDataflow, Workspace};
use flow_migrate::report::RunRecord;
use flow_migrate::runner::Migrator;
use flow_migrate::translate::{ConfigCatalog, TypeTable};

const FLOW_XML: &str = r#"<processGroup>
  <id>root</id>
  <processGroup>
    <id>df-ok</id>
    <processor>
      <name>sink_3</name>
      <class>org.apache.nifi.processors.standard.InvokeHTTP</class>
      <maxConcurrentTasks>2</maxConcurrentTasks>
    </processor>
  </processGroup>
  <processGroup>
    <id>df-bad</id>
    <processor>
      <name>mapper_1</name>
      <property><name>Rename Headers Mapping</name><value>{broken</value></property>
    </processor>
  </processGroup>
</processGroup>"#;

fn summary(name: &str, uuid: &str, state: &str) -> DataflowSummary {
    DataflowSummary {
        name: name.to_string(),
        uuid: Some(uuid.to_string()),
        status: Some(DataflowStatus { state: Some(state.to_string()) }),
    }
}

fn workspace(id: i64, name: &str, enabled: bool) -> Workspace {
    Workspace {
        id: Some(id),
        uuid: None,
        name: name.to_string(),
        enabled,
        organisations: vec![json!({"orgId": 1})],
    }
}

struct FakeLegacy;

#[async_trait]
impl LegacyApi for FakeLegacy {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        Ok(vec![workspace(1, "W", true), workspace(2, "Disabled", false)])
    }

    async fn dataflows(&self, workspace_id: i64) -> Result<Vec<DataflowSummary>> {
        assert_eq!(workspace_id, 1);
        Ok(vec![
            summary("D", "df-ok", "Live"),
            summary("Paused", "df-paused", "Paused"),
            summary("Bad", "df-bad", "live"),
            summary("Gone", "df-gone", "LIVE"),
        ])
    }

    async fn dataflow_detail(&self, _workspace_id: i64, uuid: &str) -> Result<Option<LegacyDataflow>> {
        let detail = match uuid {
            "df-ok" => DataflowBuilder::new("D")
                .uuid(uuid)
                .cron("0 0 * * * ?")
                .block("source", "sftp_pull").source().build()
                .block("sink", "s3_push").build()
                .build(),
            "df-bad" => DataflowBuilder::new("Bad")
                .uuid(uuid)
                .block("mapper", "transform_to_json").build()
                .build(),
            _ => return Ok(None),
        };
        Ok(Some(detail))
    }
}

struct NoDefinitions;

#[async_trait]
impl BlockDefinitionLookup for NoDefinitions {
    async fn block_definition(&self, block_type_id: i64) -> Result<BlockDefinition> {
        Err(anyhow!("no definition for {}", block_type_id))
    }
}

/// Records every call in order.
#[derive(Default)]
struct FakeTarget {
    calls: Mutex<Vec<String>>,
    updates: Mutex<Vec<VersionUpdate>>,
    concurrency: Mutex<Vec<ConcurrencyUpdate>>,
    fail_workspaces: bool,
}

impl FakeTarget {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TargetApi for FakeTarget {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        if self.fail_workspaces {
            return Err(anyhow!("target down"));
        }
        Ok(Vec::new())
    }

    async fn create_workspace(&self, name: &str, organisations: &[Value]) -> Result<Workspace> {
        self.record(format!("create_workspace:{}:{}", name, organisations.len()));
        Ok(workspace(10, name, true))
    }

    async fn create_dataflow(&self, name: &str) -> Result<Option<String>> {
        self.record(format!("create_dataflow:{}", name));
        Ok(Some(format!("neo-{}", name)))
    }

    async fn first_version_id(&self, dataflow_id: &str) -> Result<Option<String>> {
        self.record(format!("first_version:{}", dataflow_id));
        Ok(Some("v1".to_string()))
    }

    async fn update_version(&self, dataflow_id: &str, _version_id: &str, update: &VersionUpdate) -> Result<()> {
        self.record(format!("update_version:{}", dataflow_id));
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn post_hook(&self, dataflow_id: &str, _version_id: &str) -> Result<()> {
        self.record(format!("post_hook:{}", dataflow_id));
        Ok(())
    }

    async fn update_concurrency(&self, update: &ConcurrencyUpdate) -> Result<()> {
        self.concurrency.lock().unwrap().push(update.clone());
        Err(anyhow!("concurrency endpoint unavailable"))
    }

    async fn send_for_approval(&self, dataflow_id: &str, _version_id: &str) -> Result<()> {
        self.record(format!("send_for_approval:{}", dataflow_id));
        Ok(())
    }

    async fn approve(&self, dataflow_id: &str, _version_id: &str) -> Result<()> {
        self.record(format!("approve:{}", dataflow_id));
        Ok(())
    }

    async fn make_live(&self, dataflow_id: &str, _version_id: &str) -> Result<()> {
        self.record(format!("make_live:{}", dataflow_id));
        Ok(())
    }
}

fn migrator(target: Arc<FakeTarget>, log_dir: &std::path::Path) -> Migrator {
    let tree = FlowTree::parse(FLOW_XML).expect("fixture should parse");
    Migrator {
        legacy: Arc::new(FakeLegacy),
        target,
        flow_tree: Arc::new(StaticFlowTree(Arc::new(tree))),
        definitions: Arc::new(NoDefinitions),
        cipher: Arc::new(UnconfiguredCipher),
        catalog: Arc::new(ConfigCatalog::default()),
        type_table: TypeTable::builtin().expect("builtin table"),
        log_dir: log_dir.to_path_buf(),
    }
}

fn read_records(path: &std::path::Path) -> Vec<RunRecord> {
    fs::read_to_string(path)
        .expect("log file")
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid record"))
        .collect()
}

#[tokio::test]
async fn test_migrate_all_isolates_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = Arc::new(FakeTarget::default());
    let outcome = migrator(target.clone(), dir.path())
        .migrate_all(None, None)
        .await
        .expect("run should complete");

    // 1. One success, two failures, paused dataflow skipped
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 2);
    assert!(outcome.has_failures());
    assert!(outcome.summary_file.is_some());

    let records = read_records(&outcome.log_file);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].dataflow.as_deref(), Some("D"));
    assert_eq!(records[0].message, "Migrated with neo dataflow id neo-D");
    assert_eq!(records[1].dataflow.as_deref(), Some("Bad"));
    assert_eq!(records[1].message, "Transform JSLT/group-by generation failed");
    assert!(records[1].error.is_some());
    assert_eq!(records[2].dataflow_uuid.as_deref(), Some("df-gone"));
    assert_eq!(records[2].message, "Dataflow detail missing");

    // 2. Calls in publish order; concurrency failure did not stop the flow
    let calls = target.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "create_workspace:W:1",
            "create_dataflow:D",
            "first_version:neo-D",
            "update_version:neo-D",
            "post_hook:neo-D",
            "send_for_approval:neo-D",
            "approve:neo-D",
            "make_live:neo-D",
        ]
    );

    // 3. Payload and concurrency
    let updates = target.updates.lock().unwrap().clone();
    assert_eq!(updates[0].schedule, "0 0 * * * ?");
    assert_eq!(updates[0].blocks.len(), 2);
    let concurrency = target.concurrency.lock().unwrap().clone();
    assert_eq!(concurrency.len(), 1);
    assert_eq!(concurrency[0].block_name, "sink");
    assert_eq!(concurrency[0].concurrency, 2);
    assert_eq!(concurrency[0].processor_type, "com.capillary.foundation.processors.InvokeHttpV2");
}

#[tokio::test]
async fn test_migrate_all_filters_dataflow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = Arc::new(FakeTarget::default());
    let outcome = migrator(target.clone(), dir.path())
        .migrate_all(Some("w"), Some("DF-OK"))
        .await
        .expect("run should complete");
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 0);

    let none = migrator(Arc::new(FakeTarget::default()), dir.path())
        .migrate_all(Some("42"), None)
        .await
        .expect("run should complete");
    assert_eq!(none.succeeded + none.failed, 0);
}

#[tokio::test]
async fn test_workspace_failure_skips_its_dataflows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = Arc::new(FakeTarget { fail_workspaces: true, ..Default::default() });
    let outcome = migrator(target.clone(), dir.path())
        .migrate_all(None, None)
        .await
        .expect("run should complete");

    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed, 1);
    let records = read_records(&outcome.log_file);
    assert_eq!(records[0].message, "Failed creating/fetching workspace");
    assert_eq!(records[0].dataflow, None);
    assert!(target.calls.lock().unwrap().is_empty());
}
