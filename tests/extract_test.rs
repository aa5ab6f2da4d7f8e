use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use flow_migrate::cipher::Cipher;
use flow_migrate::client::BlockDefinitionLookup;
use flow_migrate::extract::{SecretResolver, TransformProperties, find_non_unit_concurrency, transform_props};
use flow_migrate::flowxml::{Element, FlowTree, processors};
use flow_migrate::model::builder::DataflowBuilder;
use flow_migrate::model::{BlockDefinition, ProcessorDefinition, PropertyMapping, UiField};

const FLOW_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<flowController>
  <rootGroup>
    <id>root</id>
    <processGroup>
      <id>ws-1</id>
      <processGroup>
        <id>df-1</id>
        <processor>
          <name>pull_12</name>
          <class>org.apache.nifi.processors.standard.FetchSFTP</class>
          <maxConcurrentTasks>1</maxConcurrentTasks>
          <property><name>Password</name><value>enc{terces}</value></property>
          <property><name>Hostname</name><value>sftp.example.com</value></property>
        </processor>
        <processor>
          <name>push_7</name>
          <class>org.apache.nifi.processors.standard.InvokeHTTP</class>
          <maxConcurrentTasks>1</maxConcurrentTasks>
        </processor>
        <processor>
          <name>push_8</name>
          <class>org.apache.nifi.processors.standard.PutSFTP</class>
          <maxConcurrentTasks>4</maxConcurrentTasks>
        </processor>
        <processor>
          <name>push_9</name>
          <class>org.apache.nifi.processors.standard.LogAttribute</class>
          <maxConcurrentTasks>lots</maxConcurrentTasks>
        </processor>
      </processGroup>
    </processGroup>
  </rootGroup>
</flowController>"#;

fn tree() -> FlowTree {
    FlowTree::parse(FLOW_XML).expect("fixture should parse")
}

struct Reverse;

impl Cipher for Reverse {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.chars().rev().collect())
    }
}

/// Serves one definition for type 5 and counts lookups.
struct CountingLookup {
    calls: AtomicUsize,
}

#[async_trait]
impl BlockDefinitionLookup for CountingLookup {
    async fn block_definition(&self, block_type_id: i64) -> Result<BlockDefinition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if block_type_id != 5 {
            return Err(anyhow!("unknown block type {}", block_type_id));
        }
        Ok(BlockDefinition {
            ui_fields: vec![UiField { id: Some(1), name: Some("password".to_string()) }],
            processors: vec![ProcessorDefinition {
                id: Some(12),
                properties: vec![PropertyMapping {
                    field_id: Some(1),
                    nifi_key: Some("sftp.Password".to_string()),
                }],
            }],
        })
    }
}

#[test]
fn test_parse_and_find_nested_group() {
    let tree = tree();
    let group = tree.process_group("df-1").expect("group should exist");
    assert_eq!(processors(group).len(), 4);
    assert!(tree.process_group("missing").is_none());
    assert!(FlowTree::parse("<unclosed>").is_err());
}

#[test]
fn test_element_builder_tree() {
    let root = Element::new("processGroup")
        .push(Element::with_text("id", "g"))
        .push(
            Element::new("processor")
                .push(Element::with_text("name", "p_1"))
                .push(Element::new("property").push(Element::with_text("name", "Key"))),
        );
    let tree = FlowTree::new(root);
    let group = tree.process_group("g").expect("root group should match");
    let procs = processors(group);
    assert_eq!(procs[0].name(), Some("p_1"));
    let props: Vec<(&str, &str)> = procs[0].properties().collect();
    assert_eq!(props, vec![("Key", "")]);
}

#[test]
fn test_concurrency_discovery() {
    let found = find_non_unit_concurrency(&tree(), "df-1");
    let names: Vec<&str> = found.iter().map(|p| p.processor_name.as_str()).collect();
    assert_eq!(names, vec!["push_7", "push_8"]);
    assert_eq!(found[0].concurrency, 1);
    assert_eq!(found[1].concurrency, 4);
    assert!(find_non_unit_concurrency(&tree(), "nope").is_empty());
}

#[tokio::test]
async fn test_secret_resolution_recovers_and_decrypts() {
    let lookup = Arc::new(CountingLookup { calls: AtomicUsize::new(0) });
    let resolver = SecretResolver::new(lookup.clone(), Arc::new(Reverse));

    let mut dataflow = DataflowBuilder::new("flow")
        .block("pull", "sftp_pull").type_id(5)
            .field("password", "Password", "********")
            .field("host", "Host", "")
            .build()
        .block("push", "sftp_push").type_id(5)
            .field("password", "Password", "plain")
            .build()
        .build();

    resolver.resolve(&tree(), &mut dataflow, "df-1").await;

    let pull = &dataflow.blocks[0];
    assert_eq!(pull.fields[0].value.as_deref(), Some("secret"));
    // "Host" has no ui field in the definition
    assert_eq!(pull.fields[1].value.as_deref(), Some(""));
    assert_eq!(dataflow.blocks[1].fields[0].value.as_deref(), Some("plain"));

    // Second block shares the definition
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.cache().len(), 1);
}

#[tokio::test]
async fn test_secret_resolution_skips_failed_lookups_and_missing_group() {
    let lookup = Arc::new(CountingLookup { calls: AtomicUsize::new(0) });
    let resolver = SecretResolver::new(lookup.clone(), Arc::new(Reverse));

    let mut dataflow = DataflowBuilder::new("flow")
        .block("pull", "sftp_pull").type_id(9)
            .field("password", "Password", "")
            .build()
        .build();
    resolver.resolve(&tree(), &mut dataflow, "df-1").await;
    assert_eq!(dataflow.blocks[0].fields[0].value.as_deref(), Some(""));
    assert!(resolver.cache().is_empty());

    let before = lookup.calls.load(Ordering::SeqCst);
    resolver.resolve(&tree(), &mut dataflow, "no-such-group").await;
    assert_eq!(lookup.calls.load(Ordering::SeqCst), before);
}

const TRANSFORM_XML: &str = r#"<processGroup>
  <id>df-t</id>
  <processor>
    <name>map_1</name>
    <property><name>Rename Headers Mapping</name><value> {"billNumber":"bill_no"} </value></property>
    <property><name>Date Column Header</name><value>billDate</value></property>
    <property><name>Existing Date Format</name><value>yyyy-MM-dd</value></property>
    <property><name>New Date Format</name><value>dd/MM/yyyy</value></property>
    <property><name>Record Group By</name><value>billNumber</value></property>
    <property><name>Records Per Split</name><value>500</value></property>
  </processor>
  <processor>
    <name>map_2</name>
    <property><name>Records Per Split</name><value>50</value></property>
    <property><name>attributionType</name><value>STORE</value></property>
    <property><name>jolt-spec</name><value>[{"operation":"shift","spec":{"*":"&amp;"}}]</value></property>
  </processor>
  <processor>
    <name>map_3</name>
    <property><name>Records Per Split</name><value>20</value></property>
    <property><name>attribution_type</name><value>TILL</value></property>
    <property><name>attributionType</name><value>IGNORED</value></property>
    <property><name>Sort Headers</name><value>  </value></property>
  </processor>
  <processor>
    <name>other_1</name>
    <property><name>Sort Headers</name><value>true</value></property>
  </processor>
</processGroup>"#;

#[test]
fn test_transform_props_harvest_with_prefix() {
    let tree = FlowTree::parse(TRANSFORM_XML).expect("fixture should parse");
    let props = transform_props::extract(&tree, "df-t", Some("map"));

    assert_eq!(props.header_mapping_json.as_deref(), Some(r#"{"billNumber":"bill_no"}"#));
    assert_eq!(props.date_column_output_key.as_deref(), Some("billDate"));
    assert_eq!(props.existing_date_format.as_deref(), Some("yyyy-MM-dd"));
    assert_eq!(props.new_date_format.as_deref(), Some("dd/MM/yyyy"));
    assert_eq!(props.record_group_by.as_deref(), Some("billNumber"));
    // smallest records-per-split below 100
    assert_eq!(props.group_size.as_deref(), Some("20"));
    // snake_case wins within a processor, later processors overwrite
    assert_eq!(props.attribution_type.as_deref(), Some("TILL"));
    assert_eq!(props.jolt_spec.as_deref(), Some(r#"[{"operation":"shift","spec":{"*":"&"}}]"#));
    // blank values never overwrite; other_1 is outside the prefix
    assert_eq!(props.sort_headers, None);
    assert_eq!(props.timezone_id, None);
}

#[test]
fn test_transform_props_without_prefix_and_missing_group() {
    let tree = FlowTree::parse(TRANSFORM_XML).expect("fixture should parse");
    let props = transform_props::extract(&tree, "df-t", None);
    assert_eq!(props.sort_headers.as_deref(), Some("true"));

    let empty = transform_props::extract(&tree, "absent", Some("map"));
    assert_eq!(empty, TransformProperties::default());
}
