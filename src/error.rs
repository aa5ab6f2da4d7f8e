use thiserror::Error;

/// Errors raised by the translation core and its collaborators.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Unable to load flow tree: {0}")]
    FlowTreeUnavailable(String),

    #[error("Malformed flow XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Malformed header mapping JSON: {0}")]
    MappingJson(#[source] serde_json::Error),

    #[error("Invalid type table: {0}")]
    TypeTable(#[source] serde_yaml::Error),

    #[error("Invalid block catalog: {0}")]
    Catalog(#[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
