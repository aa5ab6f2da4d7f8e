use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context as AnyhowContext};
use serde::{Serialize, Deserialize};
use crate::cipher;
use crate::error::MigrateError;

pub const AUTH_TOKEN_ENV: &str = "FLOW_MIGRATE_AUTH_TOKEN";
pub const RULE_COOKIE_ENV: &str = "FLOW_MIGRATE_RULE_COOKIE";
pub const SENSITIVE_PROPS_KEY_ENV: &str = "FLOW_MIGRATE_SENSITIVE_PROPS_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationConfig {
    pub legacy: Endpoint,
    pub target: Endpoint,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_source_header")]
    pub source_header: String,
    pub flow_xml: FlowXmlConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Absolute URL containing a `{blockTypeId}` placeholder.
    pub block_definition_url: String,
    #[serde(default)]
    pub rule_api: RuleApiConfig,
    /// Key the legacy system encrypts sensitive processor properties with.
    #[serde(default)]
    pub sensitive_props: SensitivePropsConfig,
    /// Overrides the embedded legacy-to-new type table.
    #[serde(default)]
    pub type_table: Option<PathBuf>,
    /// Block-type metadata JSON carrying each new type's default config.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub basic_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensitivePropsConfig {
    #[serde(default = "default_props_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for SensitivePropsConfig {
    fn default() -> Self {
        Self {
            algorithm: default_props_algorithm(),
            key: None,
        }
    }
}

impl SensitivePropsConfig {
    /// The key when one is set and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowXmlConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub remote_user: Option<String>,
}

impl Default for RuleApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            application_id: None,
            context: default_context(),
            cookie: None,
            remote_user: None,
        }
    }
}

fn default_source_header() -> String {
    "migration".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/flow-migration-logs")
}

fn default_props_algorithm() -> String {
    cipher::PBKDF2_AES_GCM_256.to_string()
}

fn default_context() -> String {
    "connectplus".to_string()
}

const BLOCK_TYPE_PLACEHOLDER: &str = "{blockTypeId}";

impl MigrationConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.legacy.base_url.trim().is_empty() {
            return Err(MigrateError::Config("legacy.base_url is empty".to_string()));
        }
        if self.target.base_url.trim().is_empty() {
            return Err(MigrateError::Config("target.base_url is empty".to_string()));
        }
        if !self.block_definition_url.contains(BLOCK_TYPE_PLACEHOLDER) {
            return Err(MigrateError::Config(format!(
                "block_definition_url must contain {}",
                BLOCK_TYPE_PLACEHOLDER
            )));
        }
        if self.sensitive_props.key().is_some() && !cipher::is_supported_algorithm(&self.sensitive_props.algorithm) {
            return Err(MigrateError::Config(format!(
                "unsupported sensitive_props.algorithm {}",
                self.sensitive_props.algorithm
            )));
        }
        Ok(())
    }

    /// Secrets from the environment win over values in the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            self.auth.basic_token = Some(token);
        }
        if let Ok(cookie) = std::env::var(RULE_COOKIE_ENV) {
            self.rule_api.cookie = Some(cookie);
        }
        if let Ok(key) = std::env::var(SENSITIVE_PROPS_KEY_ENV) {
            self.sensitive_props.key = Some(key);
        }
    }
}

pub fn load_config_from_yaml(file_path: &Path) -> Result<MigrationConfig> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read config file from {}", file_path.display()))?;

    let mut config: MigrationConfig = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to deserialize config from {}", file_path.display()))?;

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
