use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use anyhow::{Result, anyhow, Context as AnyhowContext};
use reqwest::{Client, Method, RequestBuilder};
use tracing::{info, warn, error};
use crate::client::{BlockDefinitionLookup, LegacyApi, TargetApi};
use crate::config::MigrationConfig;
use crate::model::{BlockDefinition, DataflowSummary, LegacyDataflow, Workspace};
use crate::model::target::{ConcurrencyUpdate, VersionUpdate};

const SOURCE_HEADER: &str = "X-CAP-SOURCE";
const REMOTE_USER_HEADER: &str = "x-cap-remote-user";

/// JSON client bound to one base URL with basic auth and an optional migration header.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    basic_token: Option<String>,
    source_header: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, basic_token: Option<String>, source_header: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_token,
            source_header,
        }
    }

    fn request(&self, method: Method, path: &str, tag_migration: bool) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url).header("Accept", "application/json");
        if let Some(token) = self.basic_token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.header("Authorization", format!("Basic {}", token));
        }
        if tag_migration {
            if let Some(source) = self.source_header.as_deref().filter(|s| !s.is_empty()) {
                builder = builder.header(SOURCE_HEADER, source);
            }
        }
        builder
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, tag_migration: bool) -> Result<T> {
        let builder = self.request(Method::GET, path, tag_migration);
        send_json(builder, "GET", path).await
    }

    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B, tag_migration: bool) -> Result<T> {
        let builder = self.request(Method::POST, path, tag_migration).json(body);
        send_json(builder, "POST", path).await
    }

    pub async fn put<B: Serialize + Sync>(&self, path: &str, body: &B, tag_migration: bool) -> Result<()> {
        let builder = self.request(Method::PUT, path, tag_migration).json(body);
        send(builder, "PUT", path).await.map(|_| ())
    }
}

async fn send(builder: RequestBuilder, method: &str, path: &str) -> Result<reqwest::Response> {
    let response = builder.send().await.map_err(|e| {
        error!(method, path, error = %e, "HTTP request failed");
        e
    })?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(method, path, status = status.as_u16(), "HTTP request rejected");
        return Err(anyhow!("{} {} returned {}: {}", method, path, status, body));
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, method: &str, path: &str) -> Result<T> {
    let response = send(builder, method, path).await?;
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode response of {} {}", method, path))
}

// --- Legacy system ---

pub struct HttpLegacyApi {
    api: ApiClient,
}

impl HttpLegacyApi {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            api: ApiClient::new(
                &config.legacy.base_url,
                config.auth.basic_token.clone(),
                Some(config.source_header.clone()),
            ),
        }
    }
}

#[async_trait]
impl LegacyApi for HttpLegacyApi {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        let list: Option<Vec<Workspace>> = self.api.get("/workspaces", false).await?;
        Ok(list.unwrap_or_default())
    }

    async fn dataflows(&self, workspace_id: i64) -> Result<Vec<DataflowSummary>> {
        let path = format!("/workspaces/{}/dataflows", workspace_id);
        let list: Option<Vec<DataflowSummary>> = self.api.get(&path, false).await?;
        Ok(list.unwrap_or_default())
    }

    async fn dataflow_detail(&self, workspace_id: i64, dataflow_uuid: &str) -> Result<Option<LegacyDataflow>> {
        let path = format!("/workspaces/{}/dataflows/{}", workspace_id, dataflow_uuid);
        self.api.get(&path, false).await
    }
}

// --- Block definitions ---

pub struct HttpBlockDefinitionLookup {
    api: ApiClient,
    url_template: String,
}

impl HttpBlockDefinitionLookup {
    /// `url_template` is an absolute URL containing `{blockTypeId}`.
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            api: ApiClient::new("", config.auth.basic_token.clone(), None),
            url_template: config.block_definition_url.clone(),
        }
    }
}

#[async_trait]
impl BlockDefinitionLookup for HttpBlockDefinitionLookup {
    async fn block_definition(&self, block_type_id: i64) -> Result<BlockDefinition> {
        let url = self.url_template.replace("{blockTypeId}", &block_type_id.to_string());
        let definition: Option<BlockDefinition> = self.api.get(&url, false).await?;
        definition.ok_or_else(|| anyhow!("Empty block definition for type {}", block_type_id))
    }
}

// --- New system ---

#[derive(Debug, Deserialize)]
struct RuleResponse<T> {
    #[serde(default)]
    success: Option<bool>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RuleRef {
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default)]
    versions: Vec<RuleRef>,
}

pub struct HttpTargetApi {
    glue: ApiClient,
    rules: Option<RuleApi>,
}

struct RuleApi {
    client: Client,
    base_url: String,
    application_id: Option<String>,
    context: String,
    cookie: Option<String>,
    remote_user: Option<String>,
}

impl RuleApi {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        if let Some(cookie) = self.cookie.as_deref().filter(|c| !c.is_empty()) {
            builder = builder.header("Cookie", cookie);
        }
        if let Some(user) = self.remote_user.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.header(REMOTE_USER_HEADER, user);
        }
        builder
    }

    async fn version_action(&self, dataflow_id: &str, version_id: &str, action: &str) -> Result<()> {
        let path = format!("/rule/{}/version/{}/{}", dataflow_id, version_id, action);
        let builder = self.request(Method::POST, &path).query(&[("context", self.context.as_str())]);
        send(builder, "POST", &path).await?;
        info!(dataflow_id, version_id, action, "Version action done");
        Ok(())
    }
}

impl HttpTargetApi {
    pub fn new(config: &MigrationConfig) -> Self {
        let rules = config.rule_api.base_url.as_deref().filter(|u| !u.is_empty()).map(|url| RuleApi {
            client: Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            application_id: config.rule_api.application_id.clone(),
            context: config.rule_api.context.clone(),
            cookie: config.rule_api.cookie.clone(),
            remote_user: config.rule_api.remote_user.clone(),
        });
        Self {
            glue: ApiClient::new(
                &config.target.base_url,
                config.auth.basic_token.clone(),
                Some(config.source_header.clone()),
            ),
            rules,
        }
    }

    fn rules(&self) -> Result<&RuleApi> {
        self.rules.as_ref().ok_or_else(|| anyhow!("rule API base URL not configured"))
    }
}

#[async_trait]
impl TargetApi for HttpTargetApi {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        let list: Option<Vec<Workspace>> = self.glue.get("/workspaces", true).await?;
        Ok(list.unwrap_or_default())
    }

    async fn create_workspace(&self, name: &str, organisations: &[Value]) -> Result<Workspace> {
        let body = json!({ "name": name, "organisations": organisations });
        self.glue.post("/workspaces", &body, true).await
    }

    async fn create_dataflow(&self, name: &str) -> Result<Option<String>> {
        let Some(rules) = self.rules.as_ref() else {
            warn!("Rule API base URL not configured; skipping create");
            return Ok(None);
        };
        let path = "/rule/create";
        let time = chrono::Utc::now().timestamp_millis().to_string();
        let body = json!({
            "name": name,
            "tags": ["migration"],
            "applicationId": rules.application_id,
            "context": rules.context,
        });
        let builder = rules.request(Method::POST, path).query(&[("time", time.as_str())]).json(&body);
        let response: RuleResponse<RuleRef> = send_json(builder, "POST", path).await?;
        if response.success != Some(true) {
            warn!(dataflow = name, "Create dataflow response was not successful");
            return Ok(None);
        }
        let id = response.result.and_then(|r| r.id);
        if let Some(id) = &id {
            info!(dataflow = name, id = %id, "Created canvas dataflow");
        }
        Ok(id)
    }

    async fn first_version_id(&self, dataflow_id: &str) -> Result<Option<String>> {
        let rules = self.rules()?;
        let path = format!("/rule/{}/versions", dataflow_id);
        let builder = rules
            .request(Method::GET, &path)
            .query(&[("ruleType", "org"), ("context", rules.context.as_str())]);
        let response: RuleResponse<VersionList> = send_json(builder, "GET", &path).await?;
        if response.success != Some(true) {
            warn!(dataflow_id, "Get versions response was not successful");
            return Ok(None);
        }
        Ok(response
            .result
            .and_then(|r| r.versions.into_iter().next())
            .and_then(|v| v.id))
    }

    async fn update_version(&self, dataflow_id: &str, version_id: &str, update: &VersionUpdate) -> Result<()> {
        let rules = self.rules()?;
        let path = format!("/rule/{}/version/{}/update", dataflow_id, version_id);
        let builder = rules
            .request(Method::POST, &path)
            .query(&[("context", rules.context.as_str())])
            .json(update);
        send(builder, "POST", &path).await?;
        info!(dataflow_id, version_id, blocks = update.blocks.len(), "Updated version");
        Ok(())
    }

    async fn post_hook(&self, dataflow_id: &str, version_id: &str) -> Result<()> {
        let rules = self.rules()?;
        let path = format!("/rule/{}/version/{}/post-hook-for-connect-plus", dataflow_id, version_id);
        let builder = rules.request(Method::POST, &path);
        let response: RuleResponse<Value> = send_json(builder, "POST", &path).await?;
        if response.success != Some(true) {
            warn!(dataflow_id, "Post-hook response was not successful");
        }
        Ok(())
    }

    async fn update_concurrency(&self, update: &ConcurrencyUpdate) -> Result<()> {
        self.glue.put("/processors/concurrency", update, true).await
    }

    async fn send_for_approval(&self, dataflow_id: &str, version_id: &str) -> Result<()> {
        self.rules()?.version_action(dataflow_id, version_id, "send-for-approval").await
    }

    async fn approve(&self, dataflow_id: &str, version_id: &str) -> Result<()> {
        self.rules()?.version_action(dataflow_id, version_id, "approve").await
    }

    async fn make_live(&self, dataflow_id: &str, version_id: &str) -> Result<()> {
        self.rules()?.version_action(dataflow_id, version_id, "make-live").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_responses_decode() {
        let created: RuleResponse<RuleRef> =
            serde_json::from_str(r#"{"success":true,"result":{"_id":"x"}}"#).expect("create response");
        assert_eq!(created.success, Some(true));
        assert_eq!(created.result.and_then(|r| r.id).as_deref(), Some("x"));

        let versions: RuleResponse<VersionList> =
            serde_json::from_str(r#"{"success":true,"result":{"versions":[{"_id":"v"}]}}"#).expect("versions response");
        let first = versions.result.and_then(|r| r.versions.into_iter().next()).and_then(|v| v.id);
        assert_eq!(first.as_deref(), Some("v"));

        let failed: RuleResponse<RuleRef> = serde_json::from_str(r#"{"success":false}"#).expect("failure response");
        assert_eq!(failed.success, Some(false));
        assert!(failed.result.is_none());
    }

    #[tokio::test]
    async fn test_create_dataflow_without_rule_api_is_skipped() {
        let config: MigrationConfig = serde_yaml::from_str(
            r#"
legacy: { base_url: "https://legacy" }
target: { base_url: "https://new" }
flow_xml: { path: /data/flow.xml }
block_definition_url: https://defs/{blockTypeId}
"#,
        )
        .expect("config");
        let api = HttpTargetApi::new(&config);
        assert_eq!(api.create_dataflow("D").await.expect("no request is made"), None);
        assert!(api.first_version_id("neo-D").await.is_err());
    }
}
