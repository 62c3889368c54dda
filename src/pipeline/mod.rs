//! Configuration synthesis pipeline
//!
//! One run, in order:
//! 1. Fetch and index the manifest
//! 2. Fetch the instrument configuration and load the channel catalog
//! 3. Build the plan source for the configured strategy
//! 4. Resolve controls, map samples and build the documents
//! 5. Write the documents locally
//! 6. Upload documents and instrument configuration to the destination
//! 7. Assemble and submit the analysis job
//!
//! Every step waits on the previous one. The first fatal error ends the
//! run; uploads already made are left in place.

mod context;
mod error;

pub use context::{RunContext, ACTOR_ID_VAR, EXECUTION_ID_VAR};
pub use error::{BoxError, PipelineError};

use crate::catalog::ChannelCatalog;
use crate::config::{PlanStrategy, Settings};
use crate::controls::{ControlResolver, ResolvedControlSet};
use crate::documents::{DocumentBuilder, DocumentLinks, DocumentSet};
use crate::job::{JobSpec, JobSpecAssembler};
use crate::manifest::{Manifest, ManifestIndex};
use crate::plan::{GraphPlanSource, InlinePlanSource, PlanResult, PlanSource};
use crate::remote::{join_path, GraphClient, JobSubmitter, ObjectStore, StorageUri};
use crate::samples::{ExperimentalRecord, SampleMapper};
use error::OrFatal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MANIFEST_FILE: &str = "manifest.json";
const PLAN_FILE: &str = "plan.json";
const CYTOMETER_FILE: &str = "cytometer_configuration.json";

/// Job input the instrument configuration is passed as
pub const CYTOMETER_INPUT_ROLE: &str = "cytometerConfiguration";

/// Everything derived from the inputs before anything is written.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Catalog restricted to channels with a positive control slot
    pub catalog: ChannelCatalog,
    pub controls: ResolvedControlSet,
    pub records: Vec<ExperimentalRecord>,
    pub documents: DocumentSet,
}

/// Resolve controls, map samples and build the documents.
pub async fn synthesize(
    index: &ManifestIndex,
    catalog: &ChannelCatalog,
    plan: &dyn PlanSource,
    links: DocumentLinks,
) -> PlanResult<Synthesis> {
    tracing::debug!(strategy = plan.strategy(), "resolving controls");
    let query = plan.resolve_controls(catalog).await?;
    let controls = ControlResolver::new(index).resolve(&query, catalog);
    let effective = controls.effective_catalog(catalog);

    let records = SampleMapper::new(index, plan).records();
    let documents = DocumentBuilder::new(links).build(&effective, &controls, &records);

    tracing::info!(
        channels = effective.len(),
        records = records.len(),
        bead_file = %controls.bead_file,
        blank_file = %controls.blank_file,
        "synthesized documents"
    );

    Ok(Synthesis {
        catalog: effective,
        controls,
        records,
        documents,
    })
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub plan_id: String,
    /// Directory the documents were (or would be) uploaded to
    pub destination: StorageUri,
    /// Locally written documents
    pub documents: Vec<PathBuf>,
    pub job: JobSpec,
    /// `None` for dry runs
    pub job_id: Option<String>,
    pub message: String,
}

/// The configuration synthesis pipeline.
///
/// Collaborators are injected so the same pipeline runs against real
/// services, local directories or in-memory fakes.
pub struct Pipeline {
    settings: Settings,
    store: Arc<dyn ObjectStore>,
    jobs: Arc<dyn JobSubmitter>,
    graph: Option<Arc<dyn GraphClient>>,
    strategy: PlanStrategy,
    workdir: Option<PathBuf>,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(settings: Settings, store: Arc<dyn ObjectStore>, jobs: Arc<dyn JobSubmitter>) -> Self {
        let strategy = settings.plan.strategy;
        Self {
            settings,
            store,
            jobs,
            graph: None,
            strategy,
            workdir: None,
            dry_run: false,
        }
    }

    /// Set the graph client used by the graph strategy.
    pub fn with_graph_client(mut self, client: Arc<dyn GraphClient>) -> Self {
        self.graph = Some(client);
        self
    }

    /// Override the configured plan strategy.
    pub fn with_strategy(mut self, strategy: PlanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Local directory for fetched inputs and written documents.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Build and write documents but skip uploads and submission.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Execute one run for the manifest at `manifest_uri`.
    pub async fn run(&self, manifest_uri: &StorageUri, run: &RunContext) -> Result<RunReport, PipelineError> {
        let workdir = self.prepare_workdir(run).await?;

        // Step 1: manifest
        tracing::info!(manifest = %manifest_uri, "fetching manifest");
        let local = self
            .store
            .download(manifest_uri, &workdir.join(MANIFEST_FILE))
            .await
            .or_fatal(run, "failed to download", manifest_uri.path())?;
        let bytes = tokio::fs::read(&local).await.or_fatal(run, "failed to read", &local.display().to_string())?;
        let manifest = Manifest::from_slice(&bytes).or_fatal(run, "was unable to properly parse the", "manifest file")?;
        let index = ManifestIndex::new(manifest);
        let manifest = index.manifest();
        tracing::debug!(
            samples = manifest.samples.len(),
            collected = index.collected_samples().count(),
            plan = %manifest.plan,
            "indexed manifest"
        );

        // Step 2: instrument configuration and channel catalog
        let (catalog, cytometer_file) = self.load_catalog(&manifest.instrument_configuration, &workdir, run).await?;

        // Step 3: plan source
        let plan = self.plan_source(&manifest.plan, &workdir, run).await?;

        // Step 4: documents
        let links = DocumentLinks {
            cytometer_configuration: manifest.instrument_configuration.clone(),
            manifest_about: manifest.about.clone(),
        };
        let synthesis = synthesize(&index, &catalog, plan.as_ref(), links)
            .await
            .or_fatal(run, "could not resolve controls for plan", &manifest.plan)?;

        // Step 5: write locally
        tracing::debug!(dir = %workdir.display(), "writing documents");
        let written = synthesis
            .documents
            .write_to(&workdir)
            .await
            .or_fatal(run, "could not write JSON file(s) to", &workdir.display().to_string())?;

        // Step 6: upload
        let assembler = JobSpecAssembler::new(&self.settings);
        let plan_id = assembler.plan_id(&manifest.plan);
        let destination = StorageUri::new(&self.settings.destination.system_id, assembler.destination_dir(&plan_id));

        let mut uploads: Vec<(&str, PathBuf)> = written
            .iter()
            .map(|(kind, path)| (kind.input_role(), path.clone()))
            .collect();
        uploads.push((CYTOMETER_INPUT_ROLE, cytometer_file));

        let inputs = if self.dry_run {
            uploads
                .iter()
                .map(|(role, path)| (role.to_string(), Self::planned_uri(&destination, path)))
                .collect()
        } else {
            self.upload_all(&destination, &uploads, run).await?
        };

        // Step 7: job
        let job = assembler
            .assemble(manifest_uri, &inputs, run)
            .or_fatal(run, "could not build job request for", &plan_id)?;
        tracing::debug!(job = ?job.redacted(), "assembled job");

        let documents = written.into_iter().map(|(_, path)| path).collect();
        if self.dry_run {
            let message = run.message("prepared job for", &job.archive_path);
            tracing::info!(plan_id = %plan_id, "dry run; skipping upload and submission");
            return Ok(RunReport {
                plan_id,
                destination,
                documents,
                job,
                job_id: None,
                message,
            });
        }

        let job_id = match self.jobs.submit(&job).await {
            Ok(id) => id,
            Err(e) => {
                let redacted = serde_json::to_string(&job.redacted()).unwrap_or_default();
                tracing::error!(job = %redacted, "job submission failed");
                return Err(PipelineError::fatal(run, "failed to submit job", job.name.clone(), e));
            }
        };

        let message = run.message(
            &format!("submitted job {} and will deposit outputs in", job_id),
            &job.archive_path,
        );
        tracing::info!("{}", message);

        Ok(RunReport {
            plan_id,
            destination,
            documents,
            job,
            job_id: Some(job_id),
            message,
        })
    }

    async fn prepare_workdir(&self, run: &RunContext) -> Result<PathBuf, PipelineError> {
        let dir = self
            .workdir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("cytoplan-{}", run.run_name())));
        tokio::fs::create_dir_all(&dir)
            .await
            .or_fatal(run, "could not create working directory", &dir.display().to_string())?;
        Ok(dir)
    }

    async fn load_catalog(
        &self,
        uri: &str,
        workdir: &Path,
        run: &RunContext,
    ) -> Result<(ChannelCatalog, PathBuf), PipelineError> {
        tracing::info!(uri = %uri, "fetching instrument configuration");
        let remote = uri.parse::<StorageUri>().or_fatal(run, "failed to download", uri)?;
        let local = self
            .store
            .download(&remote, &workdir.join(CYTOMETER_FILE))
            .await
            .or_fatal(run, "failed to download", remote.path())?;

        let target = local.display().to_string();
        let bytes = tokio::fs::read(&local).await.or_fatal(run, "failed to read", &target)?;
        let config: serde_json::Value =
            serde_json::from_slice(&bytes).or_fatal(run, "could not load dict from JSON document", &target)?;

        let catalog = ChannelCatalog::from_cytometer_configuration(&config)
            .or_fatal(run, "was unable to load", "tasbe_cytometer_configuration.channels from settings")?
            .with_mode(self.settings.matching.mode);
        tracing::debug!(channels = ?catalog.names().collect::<Vec<_>>(), mode = ?catalog.mode(), "loaded channel catalog");

        Ok((catalog, local))
    }

    async fn plan_source(
        &self,
        plan_uri: &str,
        workdir: &Path,
        run: &RunContext,
    ) -> Result<Box<dyn PlanSource>, PipelineError> {
        match self.strategy {
            PlanStrategy::Inline => {
                tracing::info!(uri = %plan_uri, "fetching plan");
                let remote = plan_uri.parse::<StorageUri>().or_fatal(run, "failed to download", plan_uri)?;
                let local = self
                    .store
                    .download(&remote, &workdir.join(PLAN_FILE))
                    .await
                    .or_fatal(run, "failed to download", remote.path())?;
                let target = local.display().to_string();
                let bytes = tokio::fs::read(&local).await.or_fatal(run, "failed to read", &target)?;
                let source = InlinePlanSource::from_slice(
                    &bytes,
                    self.settings.plan.uri_base.clone(),
                    self.settings.plan.uri_version.clone(),
                )
                .or_fatal(run, "could not load dict from JSON document", &target)?;
                Ok(Box::new(source))
            }
            PlanStrategy::Graph => {
                let client = self
                    .graph
                    .clone()
                    .ok_or("no graph query client configured")
                    .or_fatal(run, "cannot query the plan graph for", plan_uri)?;
                let source = GraphPlanSource::new(client, plan_uri).or_fatal(run, "cannot query the plan graph for", plan_uri)?;
                Ok(Box::new(source))
            }
        }
    }

    /// Upload each file into `destination`, moving any previous copy aside.
    async fn upload_all(
        &self,
        destination: &StorageUri,
        uploads: &[(&str, PathBuf)],
        run: &RunContext,
    ) -> Result<BTreeMap<String, String>, PipelineError> {
        let system = destination.system();
        let dest_dir = destination.path();

        tracing::debug!(destination = %destination, "ensuring destination exists");
        self.store
            .mkdir(system, dest_dir)
            .await
            .or_fatal(run, "could not access or create destination", dest_dir)?;

        let mut inputs = BTreeMap::new();
        for (role, local) in uploads {
            let name = local
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            tracing::info!(file = %name, destination = %dest_dir, "uploading");

            let remote_path = join_path(dest_dir, &name);
            let archived = format!("{}.{}", name, chrono::Utc::now().timestamp() * 1000);
            if let Err(e) = self.store.rename(system, &remote_path, &archived).await {
                tracing::debug!(path = %remote_path, error = %e, "previous copy does not exist or is inaccessible; ignoring");
            }

            let uri = self
                .store
                .upload(system, dest_dir, local)
                .await
                .or_fatal(run, &format!("failed to upload {} to", name), dest_dir)?;
            inputs.insert(role.to_string(), uri.to_string());
        }
        Ok(inputs)
    }

    fn planned_uri(destination: &StorageUri, local: &Path) -> String {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        destination.join(&name).to_string()
    }
}

