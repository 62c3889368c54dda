//! Cytoplan CLI — flow analysis configuration synthesis.
//!
//! Usage:
//!   cytoplan run <manifest-uri> --config settings.yml [--dry-run]
//!   cytoplan render --manifest FILE --cytometer FILE [--plan FILE] --out DIR
//!   cytoplan schema [document]

use clap::{Parser, Subcommand};
use cytoplan::pipeline::{ACTOR_ID_VAR, EXECUTION_ID_VAR};
use cytoplan::plan::ExperimentPlan;
use cytoplan::remote::{
    CommandGraphClient, CommandJobSubmitter, FsObjectStore, GraphClient, JobSubmitter, SpoolJobSubmitter,
};
use cytoplan::{
    synthesize, ChannelCatalog, DocumentKind, DocumentLinks, InlinePlanSource, Manifest, ManifestIndex, Pipeline,
    PlanStrategy, RunContext, Settings, StorageUri,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cytoplan",
    version,
    about = "Flow cytometry analysis configuration synthesis"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for a manifest
    Run {
        /// Storage URI of the manifest (agave://system/path/manifest.json)
        manifest: String,
        /// Settings file
        #[arg(long, short)]
        config: PathBuf,
        /// Working directory for fetched inputs and written documents
        #[arg(long)]
        workdir: Option<PathBuf>,
        #[arg(long, env = ACTOR_ID_VAR)]
        actor_id: Option<String>,
        #[arg(long, env = EXECUTION_ID_VAR)]
        execution_id: Option<String>,
        /// Plan strategy, overriding the settings file
        #[arg(long)]
        strategy: Option<PlanStrategy>,
        /// Write documents and print the job request without uploading or submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Build the documents from local files (inline plan strategy)
    Render {
        #[arg(long)]
        manifest: PathBuf,
        /// Instrument configuration JSON
        #[arg(long)]
        cytometer: PathBuf,
        /// Plan JSON; without it no controls or sample URIs are resolved
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        /// Settings file (plan URI base and version, match mode)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Print the JSON Schema of one or all output documents
    Schema {
        /// Document name (e.g. process_control_data)
        document: Option<DocumentKind>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cytoplan=debug" } else { "cytoplan=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    match path {
        Some(path) => Settings::from_file(path).map_err(|e| e.to_string()),
        None => Ok(Settings::default()),
    }
}

fn job_submitter(settings: &Settings, fallback_spool: &Path) -> Arc<dyn JobSubmitter> {
    if !settings.jobs.command.is_empty() {
        return Arc::new(CommandJobSubmitter::new(settings.jobs.command.clone()));
    }
    match &settings.jobs.spool_dir {
        Some(dir) => Arc::new(SpoolJobSubmitter::new(dir.clone())),
        None => {
            tracing::warn!(dir = %fallback_spool.display(), "no job submitter configured; spooling jobs");
            Arc::new(SpoolJobSubmitter::new(fallback_spool))
        }
    }
}

async fn cmd_run(
    manifest: &str,
    config: &Path,
    workdir: Option<PathBuf>,
    actor_id: Option<String>,
    execution_id: Option<String>,
    strategy: Option<PlanStrategy>,
    dry_run: bool,
) -> i32 {
    let settings = match load_settings(Some(config)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let manifest_uri: StorageUri = match manifest.parse() {
        Ok(uri) => uri,
        Err(e) => {
            eprintln!("Error: invalid manifest URI '{}': {}", manifest, e);
            return 1;
        }
    };

    let run = RunContext::resolve(settings.actor_name.clone(), actor_id, execution_id);
    let workdir = workdir.unwrap_or_else(|| std::env::temp_dir().join(format!("cytoplan-{}", run.run_name())));

    let store = Arc::new(FsObjectStore::new(settings.storage.roots.clone()));
    let jobs = job_submitter(&settings, &workdir.join("spool"));

    let mut pipeline = Pipeline::new(settings.clone(), store, jobs)
        .with_workdir(&workdir)
        .with_dry_run(dry_run);
    if !settings.graph.command.is_empty() {
        let client: Arc<dyn GraphClient> = Arc::new(CommandGraphClient::new(settings.graph.command.clone()));
        pipeline = pipeline.with_graph_client(client);
    }
    if let Some(strategy) = strategy {
        pipeline = pipeline.with_strategy(strategy);
    }

    match pipeline.run(&manifest_uri, &run).await {
        Ok(report) => {
            if dry_run {
                match serde_json::to_string_pretty(&report.job.redacted()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                }
            }
            println!("{}", report.message);
            0
        }
        Err(e) => {
            tracing::error!(error = %e, cause = ?std::error::Error::source(&e).map(|s| s.to_string()), "run failed");
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_render(manifest: &Path, cytometer: &Path, plan: Option<&Path>, out: &Path, config: Option<&Path>) -> i32 {
    match render(manifest, cytometer, plan, out, config).await {
        Ok(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn render(
    manifest: &Path,
    cytometer: &Path,
    plan: Option<&Path>,
    out: &Path,
    config: Option<&Path>,
) -> Result<Vec<PathBuf>, String> {
    let settings = load_settings(config)?;

    let read = |path: &Path| std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e));

    let manifest = Manifest::from_slice(&read(manifest)?).map_err(|e| e.to_string())?;
    let cytometer: serde_json::Value =
        serde_json::from_slice(&read(cytometer)?).map_err(|e| format!("invalid instrument configuration: {}", e))?;
    let catalog = ChannelCatalog::from_cytometer_configuration(&cytometer)
        .map_err(|e| e.to_string())?
        .with_mode(settings.matching.mode);

    let plan = match plan {
        Some(path) => InlinePlanSource::from_slice(&read(path)?, settings.plan.uri_base, settings.plan.uri_version)
            .map_err(|e| e.to_string())?,
        None => InlinePlanSource::new(ExperimentPlan::default(), settings.plan.uri_base, settings.plan.uri_version),
    };

    let links = DocumentLinks {
        cytometer_configuration: manifest.instrument_configuration.clone(),
        manifest_about: manifest.about.clone(),
    };
    let index = ManifestIndex::new(manifest);
    let synthesis = synthesize(&index, &catalog, &plan, links)
        .await
        .map_err(|e| e.to_string())?;

    tokio::fs::create_dir_all(out)
        .await
        .map_err(|e| format!("cannot create {}: {}", out.display(), e))?;
    let written = synthesis.documents.write_to(out).await.map_err(|e| e.to_string())?;
    Ok(written.into_iter().map(|(_, path)| path).collect())
}

fn cmd_schema(document: Option<DocumentKind>) -> i32 {
    let value = match document {
        Some(kind) => serde_json::to_value(kind.schema()),
        None => DocumentKind::ALL
            .into_iter()
            .map(|kind| serde_json::to_value(kind.schema()).map(|schema| (kind.name().to_string(), schema)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(serde_json::Value::Object),
    };
    match value.and_then(|v| serde_json::to_string_pretty(&v)) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Run {
            manifest,
            config,
            workdir,
            actor_id,
            execution_id,
            strategy,
            dry_run,
        } => cmd_run(&manifest, &config, workdir, actor_id, execution_id, strategy, dry_run).await,
        Commands::Render {
            manifest,
            cytometer,
            plan,
            out,
            config,
        } => cmd_render(&manifest, &cytometer, plan.as_deref(), &out, config.as_deref()).await,
        Commands::Schema { document } => cmd_schema(document),
    };

    std::process::exit(code);
}
