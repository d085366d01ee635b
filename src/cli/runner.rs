//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::cli::server::{serve, ServerConfig};
use crate::config::DataportConfig;
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::filter::DefaultDataFilter;
use crate::http::{TransportClient, TransportClientConfig};
use crate::load::{reinitialize, LoadPipeline, LoadReport};
use crate::snapshot::SnapshotStore;
use crate::target::{backup_file, TargetDb};
use crate::types::{EntityType, FailedEntity, Payload};
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = DataportConfig::load(self.cli.config.as_deref())?;
        config.validate()?;

        match self.cli.command() {
            Commands::Migrate => {
                let stdin = std::io::stdin();
                let mut input = stdin.lock();
                let mut output = std::io::stdout();
                Migration::new(config).run(&mut input, &mut output).await?;
                Ok(())
            }
            Commands::Serve { port } => serve(ServerConfig::from_config(&config, port)).await,
        }
    }
}

// ============================================================================
// Migration
// ============================================================================

/// Where the loaded payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Extracted from the live source (and saved as the new snapshot)
    Live,
    /// Read back from the snapshot after the live path failed
    Snapshot,
}

/// What a completed migration did
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    pub source: PayloadSource,
    /// Non-critical entity types the live extraction could not fetch
    pub extraction_failures: Vec<FailedEntity>,
    /// Records removed by the default-data filter
    pub filtered: usize,
    pub report: LoadReport,
}

/// How a migration run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(MigrationSummary),
    /// The operator declined the reset prompt; nothing was changed
    Declined,
}

/// One end-to-end migration: gate, extract (or fall back), filter, load
pub struct Migration {
    config: DataportConfig,
}

impl Migration {
    pub fn new(config: DataportConfig) -> Self {
        Self { config }
    }

    /// Run the migration, prompting on `input` and reporting on `output`
    pub async fn run<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let db_path = &self.config.target.database;

        {
            let db = TargetDb::open(db_path)?;
            let tables = db.list_tables()?;
            if !tables.is_empty() && !confirm_reset(input, output, db_path, tables.len())? {
                writeln!(output, "Exiting without making changes.")?;
                return Ok(RunOutcome::Declined);
            }
        }
        if self.config.target.backup {
            if let Some(backup) = backup_file(db_path)? {
                writeln!(output, "Backed up target database to {}", backup.display())?;
            }
        }

        let (payload, source, extraction_failures) = self.acquire_payload(output).await?;
        if payload.is_empty() {
            return Err(Error::run_failure("No data was extracted"));
        }
        print_counts(output, "Data to migrate", &payload)?;

        let outcome = DefaultDataFilter::from_seeds(&self.config.seeds).filter(payload);
        let filtered = outcome.total_removed();
        if filtered > 0 {
            writeln!(output, "Filtered {filtered} default record(s)")?;
        }

        let mut db = TargetDb::open(db_path)?;
        reinitialize(&mut db, &self.config.seeds)?;
        writeln!(output, "Target schema recreated and seeded")?;

        let report = LoadPipeline::new(&mut db).load(&outcome.payload);
        db.checkpoint()?;
        print_report(output, &report)?;

        info!("Migration finished in {:.1}s", start.elapsed().as_secs_f64());
        writeln!(output, "Database initialized successfully.")?;

        Ok(RunOutcome::Completed(MigrationSummary {
            source,
            extraction_failures,
            filtered,
            report,
        }))
    }

    /// Live extraction, falling back to the snapshot when it fails
    async fn acquire_payload<W: Write>(
        &self,
        output: &mut W,
    ) -> Result<(Payload, PayloadSource, Vec<FailedEntity>)> {
        let store = SnapshotStore::new(&self.config.snapshot.path);

        match self.extract_live().await {
            Ok((payload, failures)) => {
                for failure in &failures {
                    writeln!(output, "Warning: {} not extracted: {}", failure.entity, failure.error)?;
                }
                store.save(&payload).await.map_err(|e| {
                    Error::run_failure(format!("Failed to save snapshot, not resetting target: {e}"))
                })?;
                Ok((payload, PayloadSource::Live, failures))
            }
            Err(e) if e.is_recoverable_by_snapshot() || is_unconfigured_source(&e) => {
                warn!("Live extraction unavailable: {e}");
                writeln!(output, "{e}")?;
                writeln!(output, "Using local snapshot {} as fallback.", store.path().display())?;

                let payload = store.load().await.map_err(|snapshot_err| {
                    Error::run_failure(format!(
                        "Cannot proceed: {e}, and no usable snapshot ({snapshot_err})"
                    ))
                })?;
                Ok((payload, PayloadSource::Snapshot, Vec::new()))
            }
            Err(e) => Err(e),
        }
    }

    async fn extract_live(&self) -> Result<(Payload, Vec<FailedEntity>)> {
        let client = TransportClient::with_config(TransportClientConfig::from_config(&self.config))?;
        let (uid, password) = self.config.source.credentials()?;

        info!("Authenticating to {}", self.config.source.base_url);
        let session = client.authenticate(&uid, &password).await?;

        let extraction = Extractor::new(&client, self.config.transport.page_size)
            .extract_all(&session)
            .await?;
        Ok((extraction.payload, extraction.failures))
    }
}

/// No source URL or credentials configured: the snapshot is the only input
fn is_unconfigured_source(error: &Error) -> bool {
    matches!(error, Error::MissingConfigField { .. })
}

/// Ask before destroying an existing target; anything but `y` declines
pub fn confirm_reset<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    db_path: &std::path::Path,
    table_count: usize,
) -> Result<bool> {
    writeln!(
        output,
        "Warning: {} holds {table_count} table(s); all of its data will be lost!",
        db_path.display()
    )?;
    write!(output, "Do you want to continue? (y/n) ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_counts<W: Write>(output: &mut W, title: &str, payload: &Payload) -> Result<()> {
    writeln!(output, "{title}:")?;
    for entity in EntityType::EXPORT_ORDER {
        if payload.contains(entity) {
            writeln!(output, "  {entity}: {} records", payload.count(entity))?;
        } else {
            writeln!(output, "  {entity}: No data")?;
        }
    }
    Ok(())
}

fn print_report<W: Write>(output: &mut W, report: &LoadReport) -> Result<()> {
    writeln!(output, "Load results:")?;
    for stage in &report.stages {
        let t = &stage.tally;
        writeln!(
            output,
            "  {}: {} created, {} skipped, {} failed",
            stage.entity, t.created, t.skipped, t.failed
        )?;
        for error in &t.errors {
            writeln!(output, "    {error}")?;
        }
    }
    Ok(())
}
