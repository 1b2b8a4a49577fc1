//! Gradebox CLI
//!
//! A command-line tool for grading code submissions in sandboxed evaluations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gradebox::{
    Config, EXAMPLE_CONFIG, Engine, EvalLimits, EvaluateError, EvaluationReport, Score,
    SubmissionUnit, TestUnit,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradebox")]
#[command(about = "A tool for grading code submissions in sandboxed evaluations")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: gradebox.toml)
        #[arg(short, long, default_value = "gradebox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Evaluate a submission against test files
    Evaluate {
        /// Submission source file
        #[arg(value_name = "FILE")]
        submission: PathBuf,

        /// Test file (repeatable)
        #[arg(short, long = "test", value_name = "FILE", required = true)]
        tests: Vec<PathBuf>,

        /// Student identifier recorded on the evaluation
        #[arg(long, default_value = "local")]
        student: String,

        /// Assignment identifier recorded on the evaluation
        #[arg(long, default_value = "local")]
        assignment: String,

        /// Test-execution wall clock bound in milliseconds
        #[arg(short = 'T', long)]
        timeout_millis: Option<u64>,

        /// Maximum attainable score in whole points
        #[arg(short, long)]
        max_score: Option<u32>,

        /// Print the full report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Evaluate {
            submission,
            tests,
            student,
            assignment,
            timeout_millis,
            max_score,
            json,
        } => {
            run_evaluate(
                config,
                &submission,
                &tests,
                &student,
                &assignment,
                timeout_millis,
                max_score,
                json,
            )
            .await
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_evaluate(
    config: Config,
    submission: &Path,
    tests: &[PathBuf],
    student: &str,
    assignment: &str,
    timeout_millis: Option<u64>,
    max_score: Option<u32>,
    json: bool,
) -> Result<()> {
    let submission_unit = SubmissionUnit::new(
        student,
        assignment,
        file_name_of(submission)?,
        tokio::fs::read(submission)
            .await
            .context("failed to read submission file")?,
    );

    let mut test_units = Vec::with_capacity(tests.len());
    for path in tests {
        test_units.push(TestUnit::new(
            assignment,
            file_name_of(path)?,
            tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read test file {}", path.display()))?,
        ));
    }

    // Only explicitly-specified values, so config defaults still apply
    let mut limits = EvalLimits::new();
    if let Some(millis) = timeout_millis {
        limits = limits.with_timeout_millis(millis);
    }
    if let Some(points) = max_score {
        limits = limits.with_max_score(points);
    }
    let has_limits = timeout_millis.is_some() || max_score.is_some();

    info!(student, assignment, tests = test_units.len(), "evaluating submission");

    let engine = Engine::new(config);
    let report = match engine
        .evaluate(
            &submission_unit,
            &test_units,
            if has_limits { Some(&limits) } else { None },
        )
        .await
    {
        Ok(report) => report,
        Err(e @ EvaluateError::Validation(_)) => {
            let points = max_score.unwrap_or(100);
            let report = EvaluationReport::validation_failed(e.to_string(), Score::from_points(points));
            print_report(&report, json)?;
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    print_report(&report, json)?;

    if !report.is_graded() {
        // The system could not finish grading; distinct from a bad submission
        std::process::exit(2);
    }
    Ok(())
}

fn file_name_of(path: &Path) -> Result<String> {
    Ok(path
        .file_name()
        .with_context(|| format!("path has no file name: {}", path.display()))?
        .to_string_lossy()
        .into_owned())
}

fn print_report(report: &EvaluationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Status: {}", report.status);
    println!("Score: {} / {}", report.score, report.max_score);

    if let Some(ref compilation) = report.compilation {
        if !compilation.success {
            println!("\nCompiler diagnostics:");
            for diagnostic in &compilation.diagnostics {
                println!("  {diagnostic}");
            }
        }
    }

    if let Some(ref execution) = report.execution {
        println!(
            "\nTests: {} passed, {} failed, {} errored ({} total)",
            execution.passed, execution.failed, execution.errored, execution.total
        );
        for result in &execution.results {
            match &result.outcome {
                gradebox::TestOutcome::Passed => {}
                gradebox::TestOutcome::Failed { message, .. } => {
                    println!("  failed  {}: {}", result.name, message);
                }
                gradebox::TestOutcome::Errored { message, .. } => {
                    println!("  errored {}: {}", result.name, message);
                }
            }
        }

        if !matches!(report.status, gradebox::EvaluationStatus::Completed)
            && !execution.log.is_empty()
        {
            println!("\nExecution log:\n{}", execution.log);
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("Sandbox root: {}", config.sandbox_root.display());
    println!("Worker slots: {}", config.worker_slots);
    println!(
        "Allowed extensions: {}",
        config
            .allowed_extensions
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Default limits:");
    println!("  Timeout: {:?} ms", config.default_limits.timeout_millis);
    println!(
        "  Compile timeout: {:?} ms",
        config.default_limits.compile_timeout_millis
    );
    println!(
        "  Max file size: {:?} bytes",
        config.default_limits.max_file_size_bytes
    );
    println!("  Max log size: {:?} chars", config.default_limits.max_log_chars);
    println!("  Max score: {:?} points", config.default_limits.max_score);
    println!();
    println!("Compile command: {}", config.toolchain.compile.command.join(" "));
    println!("Test command: {}", config.toolchain.test.command.join(" "));
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
