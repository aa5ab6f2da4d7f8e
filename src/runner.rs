use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Result, Context as AnyhowContext};
use tracing::{error, info, warn};
use crate::cipher::Cipher;
use crate::client::{BlockDefinitionLookup, LegacyApi, TargetApi};
use crate::extract::{SecretResolver, find_non_unit_concurrency, transform_props};
use crate::flowxml::FlowTree;
use crate::flowxml::provider::FlowTreeProvider;
use crate::model::{DataflowSummary, Workspace};
use crate::report::RunLog;
use crate::translate::concurrency::plan_updates;
use crate::translate::{DefaultsCatalog, TransformContext, Translator, TypeTable};

/// Result files of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub log_file: PathBuf,
    pub summary_file: Option<PathBuf>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Why one dataflow was not migrated.
struct Failure {
    message: String,
    cause: Option<anyhow::Error>,
}

impl Failure {
    fn new(message: &str) -> Self {
        Self { message: message.to_string(), cause: None }
    }

    fn caused(message: &str, cause: anyhow::Error) -> Self {
        Self { message: message.to_string(), cause: Some(cause) }
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::caused("Migration failed", e)
    }
}

/// Migrates every live dataflow of every enabled workspace, one at a time.
pub struct Migrator {
    pub legacy: Arc<dyn LegacyApi>,
    pub target: Arc<dyn TargetApi>,
    pub flow_tree: Arc<dyn FlowTreeProvider>,
    pub definitions: Arc<dyn BlockDefinitionLookup>,
    pub cipher: Arc<dyn Cipher>,
    pub catalog: Arc<dyn DefaultsCatalog>,
    pub type_table: TypeTable,
    pub log_dir: PathBuf,
}

impl Migrator {
    /// `workspace_filter` matches a workspace id or name (ignoring case);
    /// `dataflow_filter` matches a dataflow uuid.
    pub async fn migrate_all(&self, workspace_filter: Option<&str>, dataflow_filter: Option<&str>) -> Result<RunOutcome> {
        info!(workspace = ?workspace_filter, dataflow = ?dataflow_filter, "Migration run started");
        let mut log = RunLog::new(&self.log_dir)?;

        // 1. Shared inputs for the whole run
        let tree = self.flow_tree.flow_tree().await.context("Flow export unavailable")?;
        let secrets = SecretResolver::new(self.definitions.clone(), self.cipher.clone());

        // 2. Source workspaces
        let workspaces: Vec<Workspace> = self
            .legacy
            .workspaces()
            .await
            .context("Failed to list legacy workspaces")?
            .into_iter()
            .filter(|ws| ws.enabled && matches_workspace(ws, workspace_filter))
            .collect();
        info!(count = workspaces.len(), "Workspaces selected");

        // 3. Migrate each in turn
        for workspace in &workspaces {
            self.migrate_workspace(&mut log, &tree, &secrets, workspace, dataflow_filter).await;
        }

        let summary_file = match log.write_summary() {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, "Unable to write migration summary");
                None
            }
        };
        info!(
            log = %log.path().display(),
            succeeded = log.succeeded().len(),
            failed = log.failed().len(),
            definitions_cached = secrets.cache().len(),
            "Migration run finished"
        );
        Ok(RunOutcome {
            log_file: log.path().to_path_buf(),
            summary_file,
            succeeded: log.succeeded().len(),
            failed: log.failed().len(),
        })
    }

    async fn migrate_workspace(
        &self,
        log: &mut RunLog,
        tree: &FlowTree,
        secrets: &SecretResolver,
        workspace: &Workspace,
        dataflow_filter: Option<&str>,
    ) {
        info!(workspace = %workspace.name, id = ?workspace.id, "Migrating workspace");

        let target = match self.find_or_create_workspace(workspace).await {
            Ok(ws) => ws,
            Err(e) => {
                error!(workspace = %workspace.name, error = %e, "Failed creating/fetching workspace");
                log.log_failure(&workspace.name, None, None, "Failed creating/fetching workspace", Some(&e));
                return;
            }
        };
        info!(workspace = %workspace.name, target_id = ?target.id, "Target workspace ready");

        let Some(workspace_id) = workspace.id else {
            log.log_failure(&workspace.name, None, None, "Workspace id missing", None);
            return;
        };
        let dataflows: Vec<DataflowSummary> = match self.legacy.dataflows(workspace_id).await {
            Ok(list) => list
                .into_iter()
                .filter(|df| df.is_live() && matches_dataflow(df, dataflow_filter))
                .collect(),
            Err(e) => {
                error!(workspace = %workspace.name, error = %e, "Failed listing dataflows");
                log.log_failure(&workspace.name, None, None, "Failed listing dataflows", Some(&e));
                return;
            }
        };
        info!(workspace = %workspace.name, count = dataflows.len(), "Live dataflows selected");

        for summary in &dataflows {
            let uuid = summary.uuid.as_deref();
            match self.migrate_dataflow(tree, secrets, workspace_id, summary).await {
                Ok(new_id) => {
                    info!(dataflow = %summary.name, new_id = %new_id, "Dataflow migrated");
                    let message = format!("Migrated with neo dataflow id {}", new_id);
                    log.log_success(&workspace.name, Some(&summary.name), uuid, &message);
                }
                Err(failure) => {
                    error!(dataflow = %summary.name, reason = %failure.message, cause = ?failure.cause, "Dataflow migration failed");
                    log.log_failure(&workspace.name, Some(&summary.name), uuid, &failure.message, failure.cause.as_ref());
                }
            }
        }
    }

    async fn find_or_create_workspace(&self, workspace: &Workspace) -> Result<Workspace> {
        let existing = self.target.workspaces().await?;
        if let Some(found) = existing
            .into_iter()
            .find(|ws| ws.enabled && ws.name.eq_ignore_ascii_case(&workspace.name))
        {
            info!(workspace = %workspace.name, "Reusing existing target workspace");
            return Ok(found);
        }
        self.target.create_workspace(&workspace.name, &workspace.organisations).await
    }

    /// Returns the new dataflow id.
    async fn migrate_dataflow(
        &self,
        tree: &FlowTree,
        secrets: &SecretResolver,
        workspace_id: i64,
        summary: &DataflowSummary,
    ) -> std::result::Result<String, Failure> {
        let uuid = summary.uuid.as_deref().ok_or_else(|| Failure::new("Dataflow uuid missing"))?;

        // 1. Detail + secrets
        let mut detail = self
            .legacy
            .dataflow_detail(workspace_id, uuid)
            .await?
            .ok_or_else(|| Failure::new("Dataflow detail missing"))?;
        secrets.resolve(tree, &mut detail, uuid).await;

        // 2. Transform context
        let context = match detail.transform_block() {
            Some(block) => {
                let props = transform_props::extract(tree, uuid, Some(&block.name));
                let ctx = TransformContext::build(&props)
                    .map_err(|e| Failure::caused("Transform JSLT/group-by generation failed", e.into()))?;
                Some(ctx)
            }
            None => None,
        };

        // 3. Draft in the new system
        let dataflow_id = self
            .target
            .create_dataflow(&detail.name)
            .await?
            .ok_or_else(|| Failure::new("Neo rule API not configured or create canvas failed"))?;
        let version_id = self
            .target
            .first_version_id(&dataflow_id)
            .await?
            .ok_or_else(|| Failure::new("Get versions failed"))?;

        // 4. Blocks + schedule
        let translator = Translator::new(&self.type_table, self.catalog.as_ref());
        let update = translator.version_update(&detail, context.as_ref());
        self.target.update_version(&dataflow_id, &version_id, &update).await?;
        self.target.post_hook(&dataflow_id, &version_id).await?;

        // 5. Concurrency, best effort
        let entries = find_non_unit_concurrency(tree, uuid);
        for request in plan_updates(&detail.blocks, &update.blocks, &entries, &dataflow_id, &version_id) {
            if let Err(e) = self.target.update_concurrency(&request).await {
                warn!(block = %request.block_name, processor = %request.processor_type, error = %e, "Failed to update concurrency");
            }
        }

        // 6. Publish
        self.target.send_for_approval(&dataflow_id, &version_id).await?;
        self.target.approve(&dataflow_id, &version_id).await?;
        self.target.make_live(&dataflow_id, &version_id).await?;

        Ok(dataflow_id)
    }
}

fn matches_workspace(workspace: &Workspace, filter: Option<&str>) -> bool {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };
    workspace.id.is_some_and(|id| id.to_string() == filter) || workspace.name.eq_ignore_ascii_case(filter)
}

fn matches_dataflow(dataflow: &DataflowSummary, filter: Option<&str>) -> bool {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };
    dataflow.uuid.as_deref().is_some_and(|u| u.eq_ignore_ascii_case(filter))
}
