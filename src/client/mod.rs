use async_trait::async_trait;
use anyhow::Result;
use serde_json::Value;
use crate::model::{BlockDefinition, DataflowSummary, LegacyDataflow, Workspace};
use crate::model::target::{ConcurrencyUpdate, VersionUpdate};

pub mod http;

/// Maps a block type id to the definition linking display fields to processor properties.
#[async_trait]
pub trait BlockDefinitionLookup: Send + Sync {
    async fn block_definition(&self, block_type_id: i64) -> Result<BlockDefinition>;
}

/// Read side of the legacy dataflow system.
#[async_trait]
pub trait LegacyApi: Send + Sync {
    async fn workspaces(&self) -> Result<Vec<Workspace>>;
    async fn dataflows(&self, workspace_id: i64) -> Result<Vec<DataflowSummary>>;
    async fn dataflow_detail(&self, workspace_id: i64, dataflow_uuid: &str) -> Result<Option<LegacyDataflow>>;
}

/// Write side of the new dataflow system.
#[async_trait]
pub trait TargetApi: Send + Sync {
    async fn workspaces(&self) -> Result<Vec<Workspace>>;
    async fn create_workspace(&self, name: &str, organisations: &[Value]) -> Result<Workspace>;

    /// Creates an empty canvas dataflow and returns its id, or `None` when the service declined.
    async fn create_dataflow(&self, name: &str) -> Result<Option<String>>;
    async fn first_version_id(&self, dataflow_id: &str) -> Result<Option<String>>;
    async fn update_version(&self, dataflow_id: &str, version_id: &str, update: &VersionUpdate) -> Result<()>;
    async fn post_hook(&self, dataflow_id: &str, version_id: &str) -> Result<()>;
    async fn update_concurrency(&self, update: &ConcurrencyUpdate) -> Result<()>;
    async fn send_for_approval(&self, dataflow_id: &str, version_id: &str) -> Result<()>;
    async fn approve(&self, dataflow_id: &str, version_id: &str) -> Result<()>;
    async fn make_live(&self, dataflow_id: &str, version_id: &str) -> Result<()>;
}
