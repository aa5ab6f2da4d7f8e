use clap::{Parser, Subcommand};
use flow_migrate::cipher::{Cipher, NifiCipher, UnconfiguredCipher};
use flow_migrate::client::http::{HttpBlockDefinitionLookup, HttpLegacyApi, HttpTargetApi};
use flow_migrate::config::load_config_from_yaml;
use flow_migrate::extract::{find_non_unit_concurrency, transform_props};
use flow_migrate::flowxml::FlowTree;
use flow_migrate::flowxml::provider::FileFlowTreeProvider;
use flow_migrate::model::LegacyDataflow;
use flow_migrate::runner::Migrator;
use flow_migrate::script::{DateFormat, classify, generate, resolve_group_by};
use flow_migrate::translate::{ConfigCatalog, TransformContext, Translator, TypeTable};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Result, anyhow, Context as AnyhowContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate live dataflows from the legacy system into the new one
    Migrate {
        /// Path to the migration config YAML
        #[arg(long, short)]
        config: PathBuf,

        /// Only this workspace (id or name)
        #[arg(long, short)]
        workspace: Option<String>,

        /// Only this dataflow uuid
        #[arg(long, short)]
        dataflow: Option<String>,
    },

    /// Translate one exported dataflow offline and print the version payload
    Translate {
        /// Legacy dataflow detail JSON
        #[arg(long, short)]
        dataflow: PathBuf,

        /// Block-type metadata JSON with default configs
        #[arg(long)]
        catalog: PathBuf,

        /// Flow export XML, used for transform properties and concurrency
        #[arg(long, requires = "uuid")]
        flow_xml: Option<PathBuf>,

        /// Process group id of the dataflow in the flow export
        #[arg(long)]
        uuid: Option<String>,

        /// Replacement for the builtin type table
        #[arg(long)]
        type_table: Option<PathBuf>,
    },

    /// Compile a header mapping into a JSLT script
    Jslt {
        /// Header mapping JSON file
        #[arg(long, short)]
        mapping: PathBuf,

        /// Output key of the date column
        #[arg(long)]
        date_key: Option<String>,

        /// Existing date format
        #[arg(long, requires = "date_key")]
        from: Option<String>,

        /// New date format
        #[arg(long, requires = "date_key")]
        to: Option<String>,

        #[arg(long)]
        timezone: Option<String>,

        /// Also resolve this comma-separated group-by list to source names
        #[arg(long)]
        group_by: Option<String>,
    },

    /// Print whether a Jolt spec expects an OBJECT or ARRAY input
    JoltShape {
        file: PathBuf,
    },
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_migrate(config_path: &Path, workspace: Option<&str>, dataflow: Option<&str>) -> Result<()> {
    let config = load_config_from_yaml(config_path)?;

    let catalog = match &config.catalog {
        Some(path) => ConfigCatalog::load(path),
        None => {
            warn!("No block catalog configured, migrated blocks get empty configs");
            ConfigCatalog::default()
        }
    };

    let cipher: Arc<dyn Cipher> = match config.sensitive_props.key() {
        Some(key) => Arc::new(NifiCipher::new(&config.sensitive_props.algorithm, key)?),
        None => {
            warn!("No sensitive properties key configured, encrypted values are kept as ciphertext");
            Arc::new(UnconfiguredCipher)
        }
    };

    let migrator = Migrator {
        legacy: Arc::new(HttpLegacyApi::new(&config)),
        target: Arc::new(HttpTargetApi::new(&config)),
        flow_tree: Arc::new(FileFlowTreeProvider::new(config.flow_xml.path.clone())),
        definitions: Arc::new(HttpBlockDefinitionLookup::new(&config)),
        cipher,
        catalog: Arc::new(catalog),
        type_table: TypeTable::load_or_builtin(config.type_table.as_deref())?,
        log_dir: config.log_dir.clone(),
    };

    let outcome = migrator.migrate_all(workspace, dataflow).await?;
    info!(
        log = %outcome.log_file.display(),
        summary = ?outcome.summary_file,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "Migration finished"
    );
    if outcome.has_failures() {
        return Err(anyhow!("{} dataflow(s) failed, see {}", outcome.failed, outcome.log_file.display()));
    }
    Ok(())
}

fn run_translate(
    dataflow_path: &Path,
    catalog_path: &Path,
    flow_xml: Option<&Path>,
    uuid: Option<&str>,
    type_table: Option<&Path>,
) -> Result<()> {
    let dataflow: LegacyDataflow = serde_json::from_str(&read_file(dataflow_path)?)
        .with_context(|| format!("Failed to parse dataflow {}", dataflow_path.display()))?;
    let catalog = ConfigCatalog::from_json(&read_file(catalog_path)?)?;
    let table = TypeTable::load_or_builtin(type_table)?;

    let tree = match flow_xml {
        Some(path) => Some(FlowTree::parse(&read_file(path)?)?),
        None => None,
    };

    let mut context = None;
    if let (Some(tree), Some(uuid)) = (&tree, uuid) {
        if let Some(block) = dataflow.transform_block() {
            let props = transform_props::extract(tree, uuid, Some(&block.name));
            context = Some(TransformContext::build(&props)?);
        }
        for entry in find_non_unit_concurrency(tree, uuid) {
            info!(processor = %entry.processor_name, class = %entry.processor_class, concurrency = entry.concurrency, "Concurrency to propagate");
        }
    }

    let update = Translator::new(&table, &catalog).version_update(&dataflow, context.as_ref());
    println!("{}", serde_json::to_string_pretty(&update)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { config, workspace, dataflow } => {
            run_migrate(&config, workspace.as_deref(), dataflow.as_deref()).await?;
        }

        Commands::Translate { dataflow, catalog, flow_xml, uuid, type_table } => {
            run_translate(&dataflow, &catalog, flow_xml.as_deref(), uuid.as_deref(), type_table.as_deref())?;
        }

        Commands::Jslt { mapping, date_key, from, to, timezone, group_by } => {
            let mapping = read_file(&mapping)?;
            let date = match (date_key, from, to) {
                (Some(key), Some(from), Some(to)) => {
                    let format = DateFormat::new(&key, &from, &to);
                    Some(match timezone.as_deref() {
                        Some(tz) => format.with_timezone(tz),
                        None => format,
                    })
                }
                _ => None,
            };
            println!("{}", generate(&mapping, date.as_ref())?);
            if let Some(names) = group_by {
                println!("groupBy: {}", resolve_group_by(&names, &mapping)?);
            }
        }

        Commands::JoltShape { file } => {
            println!("{}", classify(&read_file(&file)?));
        }
    }

    Ok(())
}
