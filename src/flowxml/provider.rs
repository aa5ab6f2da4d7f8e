use std::path::PathBuf;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;
use crate::error::{MigrateError, Result};
use crate::flowxml::FlowTree;

/// Source of the legacy flow export.
#[async_trait]
pub trait FlowTreeProvider: Send + Sync {
    async fn flow_tree(&self) -> Result<Arc<FlowTree>>;
}

/// Reads the export from a local copy and keeps the parsed tree for the rest of the run.
pub struct FileFlowTreeProvider {
    path: PathBuf,
    cache: OnceCell<Arc<FlowTree>>,
}

impl FileFlowTreeProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }
}

#[async_trait]
impl FlowTreeProvider for FileFlowTreeProvider {
    async fn flow_tree(&self) -> Result<Arc<FlowTree>> {
        self.cache
            .get_or_try_init(|| async {
                info!(path = %self.path.display(), "Loading flow export");
                let xml = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                    MigrateError::FlowTreeUnavailable(format!("{}: {}", self.path.display(), e))
                })?;
                let tree = FlowTree::parse(&xml)
                    .map_err(|e| MigrateError::FlowTreeUnavailable(e.to_string()))?;
                Ok(Arc::new(tree))
            })
            .await
            .cloned()
    }
}

/// Provider over an already parsed tree.
pub struct StaticFlowTree(pub Arc<FlowTree>);

#[async_trait]
impl FlowTreeProvider for StaticFlowTree {
    async fn flow_tree(&self) -> Result<Arc<FlowTree>> {
        Ok(self.0.clone())
    }
}
