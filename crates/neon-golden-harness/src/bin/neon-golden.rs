//! CLI entrypoint for the Neon golden-file test harness.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use neon_golden_harness::config::{
    self, BuildMode, DEFAULT_COMPILER, DEFAULT_OUTPUT, DEFAULT_TARGET, HarnessConfig, Palette,
};
use neon_golden_harness::console::{Console, Tag};
use neon_golden_harness::structured_log::LogEmitter;
use neon_golden_harness::{Engine, HarnessError, RecordOutcome, Recorder, RunReport, RunStats};

/// Run or update the Neon golden tests.
#[derive(Debug, Parser)]
#[command(name = "neon-golden")]
#[command(about = "Golden-file test harness for the Neon compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output directory for build artifacts.
    #[arg(long, short = 'o', global = true, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Compiler binary under test.
    #[arg(long, global = true, default_value = DEFAULT_COMPILER)]
    compiler: PathBuf,
    /// Build mode to evaluate (repeatable): non-optimized, optimized, debug.
    #[arg(long = "mode", global = true)]
    modes: Vec<String>,
    /// Disable ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,
    /// Write a structured JSONL log to this path.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Run identifier used in structured-log trace IDs.
    #[arg(long, global = true)]
    run_id: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the tests against their records.
    Run {
        /// Fixture file or directory.
        #[arg(default_value = DEFAULT_TARGET)]
        target: PathBuf,
        /// Write a markdown report here (and a JSON sibling).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Update records from actual behavior.
    #[command(alias = "record")]
    Update {
        #[command(subcommand)]
        what: UpdateCommand,
    },
    /// Print a record as JSON.
    Inspect {
        /// Record file (`.txt`) or its fixture (`.ne`).
        record: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum UpdateCommand {
    /// Re-record build result, exit code, stdout, and stderr.
    Output {
        /// Fixture file or directory.
        #[arg(default_value = DEFAULT_TARGET)]
        target: PathBuf,
    },
    /// Re-record argv and stdin; stdin is read from the terminal until EOF.
    Input {
        /// Fixture file.
        target: PathBuf,
        /// Arguments passed to the program.
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let palette = if cli.no_color {
        Palette::plain()
    } else {
        Palette::ansi()
    };

    match execute(cli, palette) {
        Ok(status) => status,
        Err(err) => {
            Console::stdout(palette).line(Tag::Error, format_args!("{err}"));
            ExitCode::FAILURE
        }
    }
}

/// Run one command. Fixture failures are reported through the summary and
/// the returned status; `Err` is reserved for fatal errors.
fn execute(cli: Cli, palette: Palette) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let modes = parse_modes(&cli.modes)?;
    let run_id = cli.run_id.clone().unwrap_or_else(default_run_id);
    let log = match &cli.log {
        Some(path) => LogEmitter::to_file(path, &run_id).map_err(HarnessError::Log)?,
        None => LogEmitter::disabled(),
    };
    let config_for = |target: &Path| {
        HarnessConfig::new(
            &cli.compiler,
            config::fixture_root_for(target),
            &cli.output,
        )
        .with_palette(palette)
    };

    match &cli.command {
        Command::Run { target, report } => {
            prepare(palette, target, &cli.output)?;
            let config = config_for(target.as_path()).with_modes(modes.clone());

            let mut engine = Engine::new(config, Box::new(std::io::stdout()), log);
            let mut stats = RunStats::default();
            engine.run_target(target, &mut stats)?;
            engine.summarize(&stats)?;

            if let Some(report_path) = report {
                let report_doc = RunReport::new(
                    target.display().to_string(),
                    modes.iter().map(|m| m.label().to_string()).collect(),
                    stats.clone(),
                );
                std::fs::write(report_path, report_doc.to_markdown())?;
                std::fs::write(report_path.with_extension("json"), report_doc.to_json())?;
                eprintln!("Wrote report to {}", report_path.display());
            }

            if !stats.all_passed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Update { what } => match what {
            UpdateCommand::Output { target } => {
                prepare(palette, target, &cli.output)?;
                let config = config_for(target.as_path());
                let mut recorder = Recorder::new(config, Box::new(std::io::stdout()), log);
                let outcomes = recorder.record_output_target(target)?;
                let skipped = outcomes
                    .iter()
                    .filter(|o| !matches!(o, RecordOutcome::Saved { .. }))
                    .count();
                eprintln!(
                    "Recorded {} fixture(s), skipped {skipped}",
                    outcomes.len() - skipped
                );
            }
            UpdateCommand::Input { target, args } => {
                prepare(palette, target, &cli.output)?;
                if !target.is_file() {
                    return Err(HarnessError::InputRequiresFile(target.clone()).into());
                }
                let config = config_for(target.as_path());
                let mut recorder = Recorder::new(config, Box::new(std::io::stdout()), log);
                recorder.record_input(target, args.clone(), &mut std::io::stdin().lock())?;
            }
        },
        Command::Inspect { record } => {
            let record = if record
                .extension()
                .is_some_and(|ext| ext == config::FIXTURE_EXTENSION)
            {
                record.with_extension(config::RECORD_EXTENSION)
            } else {
                record.clone()
            };
            let Some(case) = neon_golden_record::load(&record)? else {
                return Err(format!("no record at {}", record.display()).into());
            };
            let view = serde_json::json!({
                "record": record.display().to_string(),
                "builds": case.builds,
                "argv": case.argv,
                "stdin": String::from_utf8_lossy(&case.stdin),
                "returncode": case.returncode,
                "stdout": String::from_utf8_lossy(&case.stdout),
                "stderr": String::from_utf8_lossy(&case.stderr),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Validate target/output and create the output tree if needed.
fn prepare(palette: Palette, target: &Path, output: &Path) -> Result<(), HarnessError> {
    config::check_target_and_output(target, output)?;
    if !output.exists() {
        Console::stdout(palette).line(
            Tag::Info,
            format_args!("Creating output target {}", output.display()),
        );
        std::fs::create_dir_all(output).map_err(|source| HarnessError::Io {
            path: output.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn parse_modes(raw: &[String]) -> Result<Vec<BuildMode>, Box<dyn std::error::Error>> {
    if raw.is_empty() {
        return Ok(BuildMode::ALL.to_vec());
    }
    let mut modes = Vec::with_capacity(raw.len());
    for name in raw {
        let mode = BuildMode::from_str_loose(name).ok_or_else(|| {
            format!("Unsupported mode '{name}', expected non-optimized|optimized|debug")
        })?;
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }
    Ok(modes)
}

fn default_run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("run-{secs}-{}", std::process::id())
}
