//! aud CLI - Command-line interface for AU deception scoring
//!
//! Commands:
//! - predict: Score per-chunk AU tables with a model store
//! - reconcile: Merge chunk tables into the canonical feature matrix
//! - doctor: Diagnose model store health and configuration
//! - schema: Print the canonical input features or output columns

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use au_deception::encoder::{
    feature_table_to_csv, table_to_csv, table_to_ndjson, ReportEncoder, OUTPUT_COLUMNS,
};
use au_deception::ensemble::{load_member, ModelStore};
use au_deception::schema::{ChunkSource, SCHEMA_VERSION};
use au_deception::types::Summary;
use au_deception::{
    DeceptionPipeline, FeatureTableReconciler, PipelineConfig, PipelineError, CRATE_VERSION,
    PRODUCER_NAME, REFERENCE_WINDOW_SIZE,
};

/// aud - Deception scoring over facial action unit time series
#[derive(Parser)]
#[command(name = "aud")]
#[command(version = CRATE_VERSION)]
#[command(about = "Score AU time series with a window classifier ensemble", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score chunk tables and write the per-window result table
    Predict {
        /// Model store directory containing ensemble_metadata.json
        #[arg(long)]
        model_dir: PathBuf,

        /// Deception threshold (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Video frame rate (overrides config)
        #[arg(long)]
        fps: Option<f64>,

        /// Pipeline configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Print summary statistics to stderr
        #[arg(long)]
        summary: bool,

        /// Chunk CSV files or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Merge chunk tables into the canonical feature matrix
    Reconcile {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Chunk CSV files or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Diagnose model store health and configuration
    Doctor {
        /// Model store directory to check
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as a JSON array
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated table, one row per window
    Csv,
    /// JSON report with parameters and summary
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Canonical AU feature columns
    Input,
    /// Result table columns
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), AudCliError> {
    match cli.command {
        Commands::Predict {
            model_dir,
            threshold,
            fps,
            config,
            output,
            format,
            summary,
            inputs,
        } => cmd_predict(
            &model_dir,
            threshold,
            fps,
            config.as_deref(),
            &output,
            format,
            summary,
            &inputs,
        ),

        Commands::Reconcile { output, inputs } => cmd_reconcile(&output, &inputs),

        Commands::Doctor { model_dir, json } => cmd_doctor(model_dir.as_deref(), json),

        Commands::Schema { schema_type, json } => cmd_schema(schema_type, json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_predict(
    model_dir: &Path,
    threshold: Option<f64>,
    fps: Option<f64>,
    config_path: Option<&Path>,
    output: &Path,
    format: OutputFormat,
    summary: bool,
    inputs: &[PathBuf],
) -> Result<(), AudCliError> {
    // Load configuration, then apply flag overrides
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if let Some(t) = threshold {
        config = config.with_threshold(t);
    }
    if let Some(f) = fps {
        config = config.with_fps(f);
    }

    let pipeline = DeceptionPipeline::from_model_store(config, model_dir)?;
    let sources = read_sources(inputs)?;
    let table = pipeline.run_sources(&sources)?;

    let output_data = match format {
        OutputFormat::Csv => table_to_csv(&table)?,
        OutputFormat::Ndjson => table_to_ndjson(&table)?,
        OutputFormat::Json => {
            ReportEncoder::new().encode_to_json(&table, &pipeline.member_names())? + "\n"
        }
        OutputFormat::JsonPretty => {
            ReportEncoder::new().encode_to_json_pretty(&table, &pipeline.member_names())? + "\n"
        }
    };
    write_output(output, &output_data)?;

    if summary {
        if let Some(s) = table.summary() {
            eprint!("{}", format_summary(&s));
        }
    }

    Ok(())
}

fn cmd_reconcile(output: &Path, inputs: &[PathBuf]) -> Result<(), AudCliError> {
    let sources = read_sources(inputs)?;
    let table = FeatureTableReconciler::default().reconcile_sources(&sources)?;
    write_output(output, &feature_table_to_csv(&table)?)?;
    Ok(())
}

fn cmd_doctor(model_dir: Option<&Path>, json: bool) -> Result<(), AudCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();
    let feature_count = PipelineConfig::default().schema.len();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, CRATE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {} ({} features)", SCHEMA_VERSION, feature_count),
    });

    if let Some(dir) = model_dir {
        checks.extend(check_model_store(dir, feature_count));
    }

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (use --output to write a file)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a pipe (results can be streamed)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CRATE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("aud Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(AudCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_model_store(dir: &Path, feature_count: usize) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();

    let manifest = match ModelStore::read_manifest(dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            checks.push(DoctorCheck {
                name: "manifest".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            return checks;
        }
    };

    checks.push(DoctorCheck {
        name: "manifest".to_string(),
        status: if manifest.model_paths.is_empty() {
            CheckStatus::Error
        } else {
            CheckStatus::Ok
        },
        message: format!("{} models listed", manifest.model_paths.len()),
    });

    checks.push(if manifest.s_size == REFERENCE_WINDOW_SIZE {
        DoctorCheck {
            name: "window_size".to_string(),
            status: CheckStatus::Ok,
            message: format!("Window size {}", manifest.s_size),
        }
    } else {
        DoctorCheck {
            name: "window_size".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "Window size {} differs from the reference {}",
                manifest.s_size, REFERENCE_WINDOW_SIZE
            ),
        }
    });

    for rel in &manifest.model_paths {
        let check = match load_member(&dir.join(rel), manifest.s_size, feature_count) {
            Ok(member) => DoctorCheck {
                name: format!("model:{}", member.name()),
                status: CheckStatus::Ok,
                message: format!("Loaded {}", rel),
            },
            Err(e) => DoctorCheck {
                name: format!("model:{}", rel),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(check);
    }

    checks
}

fn cmd_schema(schema_type: SchemaType, json: bool) -> Result<(), AudCliError> {
    let columns: Vec<String> = match schema_type {
        SchemaType::Input => PipelineConfig::default().schema.names().to_vec(),
        SchemaType::Output => OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("Chunk tables are CSV files named chunk_<n>.csv with a header row.");
            println!("Columns outside this list are ignored; missing ones are zero-filled.");
        }
        SchemaType::Output => {
            println!("Output Schema: one row per analysis window, ordered by frame");
        }
    }
    println!();
    for column in &columns {
        println!("  {}", column);
    }

    Ok(())
}

// Helper functions

fn format_summary(s: &Summary) -> String {
    let mut out = String::new();
    out.push_str("Deception Summary\n");
    out.push_str("=================\n");
    out.push_str(&format!("Windows:            {}\n", s.window_count));
    out.push_str(&format!("Frames:             {}\n", s.total_frames));
    out.push_str(&format!("Duration:           {:.2}s\n", s.duration_seconds));
    out.push_str(&format!("Threshold:          {:.2}\n", s.threshold));
    out.push_str("\nBased on Deception Score:\n");
    out.push_str(&format!("  Truthful:         {:.1}%\n", s.truthful_fraction * 100.0));
    out.push_str(&format!("  Deceptive:        {:.1}%\n", s.deceptive_fraction * 100.0));
    out.push_str("\nBased on Binary Classification:\n");
    out.push_str(&format!("  Truthful:         {:.1}%\n", s.binary_truth_fraction * 100.0));
    out.push_str(&format!("  Deceptive:        {:.1}%\n", s.binary_deception_fraction * 100.0));
    out.push_str(&format!("\nMean score:         {:.4}\n", s.mean_score));
    out.push_str(&format!("Mean confidence:    {:.4}\n", s.mean_confidence));
    out
}

/// Expand directories into their CSV files and read every input.
///
/// An unreadable file is logged and skipped; the reconciler reports
/// `EmptyInput` if nothing is left.
fn read_sources(inputs: &[PathBuf]) -> Result<Vec<ChunkSource>, AudCliError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }

    if paths.is_empty() {
        return Err(AudCliError::NoInputs);
    }

    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        match fs::read(path) {
            Ok(bytes) => sources.push(ChunkSource::new(path.display().to_string(), bytes)),
            Err(e) => log::warn!("Skipping chunk table {}: {}", path.display(), e),
        }
    }
    Ok(sources)
}

fn write_output(output: &Path, data: &str) -> Result<(), AudCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum AudCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    NoInputs,
    DoctorFailed,
}

impl From<io::Error> for AudCliError {
    fn from(e: io::Error) -> Self {
        AudCliError::Io(e)
    }
}

impl From<PipelineError> for AudCliError {
    fn from(e: PipelineError) -> Self {
        AudCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for AudCliError {
    fn from(e: serde_json::Error) -> Self {
        AudCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AudCliError> for CliError {
    fn from(e: AudCliError) -> Self {
        match e {
            AudCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AudCliError::Pipeline(e) => {
                let hint = match &e {
                    PipelineError::EmptyInput(_) | PipelineError::NoFrames => {
                        Some("Ensure the chunk tables exist and contain data rows".to_string())
                    }
                    PipelineError::ModelLoad { .. } | PipelineError::EmptyEnsemble => {
                        Some("Run 'aud doctor --model-dir <DIR>' for details".to_string())
                    }
                    PipelineError::InvalidConfig(_) => {
                        Some("Check --threshold, --fps and the config file".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            AudCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AudCliError::NoInputs => CliError {
                code: "NO_INPUTS".to_string(),
                message: "No chunk tables found in input".to_string(),
                hint: Some("Pass CSV files or a directory containing them".to_string()),
            },
            AudCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
