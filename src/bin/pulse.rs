//! Pulse CLI - Command-line interface for Mindpulse
//!
//! Commands:
//! - replay: Drive a fresh registry through a recorded event stream and
//!   print per-session summaries (deterministic, offset-based clock)
//! - doctor: Diagnose engine health and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mindpulse::{EventMeta, Insight, LogOutcome, MetricsReport, SessionRegistry};
use mindpulse::{ENGINE_VERSION, PRODUCER_NAME};

/// Pulse - Replay and inspect behavioral telemetry sessions
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Per-session cognitive load scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event stream through a fresh registry
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Base instant for offset 0, RFC3339 (defaults to the epoch)
        #[arg(long)]
        base_time: Option<String>,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Check that a recording file parses as replay input
        #[arg(long)]
        recording: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one summary per line)
    Ndjson,
    /// JSON array of summaries
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// One line of replay input: an event plus its offset from the base instant.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayRecord {
    session_id: String,
    event_type: String,
    #[serde(default)]
    meta: EventMeta,
    /// Milliseconds since the replay base instant
    at_ms: i64,
}

/// Per-session summary emitted after the replay finishes.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    producer: Producer,
    session_id: String,
    events_ingested: usize,
    metrics: MetricsReport,
    insight: Insight,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Producer {
    name: String,
    version: String,
    instance_id: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output_format,
            base_time,
        } => cmd_replay(&input, output_format, base_time.as_deref()),

        Commands::Doctor { recording, json } => cmd_doctor(recording.as_deref(), json),
    }
}

fn cmd_replay(
    input: &PathBuf,
    output_format: OutputFormat,
    base_time: Option<&str>,
) -> Result<(), PulseCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = parse_records(&input_data)?;
    if records.is_empty() {
        return Err(PulseCliError::NoRecords);
    }

    let base = match base_time {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| PulseCliError::ParseError(format!("Invalid base time: {e}")))?
            .with_timezone(&Utc),
        None => Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now),
    };

    let registry = SessionRegistry::new();
    let mut session_order: Vec<String> = Vec::new();
    let mut end_offset_ms: i64 = 0;

    for record in &records {
        let now = base + Duration::milliseconds(record.at_ms);
        end_offset_ms = end_offset_ms.max(record.at_ms);

        // Sessions are started implicitly on first sight so that no event
        // of the recording is absorbed.
        if !registry.contains_session(&record.session_id) {
            registry.start_session_at(&record.session_id, now)?;
            session_order.push(record.session_id.clone());
        }

        let outcome =
            registry.log_event_at(&record.session_id, &record.event_type, record.meta.clone(), now)?;
        debug_assert_eq!(outcome, LogOutcome::Logged);
    }

    let end = base + Duration::milliseconds(end_offset_ms);
    let mut summaries: Vec<SessionSummary> = Vec::new();

    for session_id in &session_order {
        let metrics = registry.get_metrics_at(session_id, end)?;
        let insight = registry.generate_insight_at(session_id, end)?;
        let events_ingested = records
            .iter()
            .filter(|r| &r.session_id == session_id)
            .count();

        summaries.push(SessionSummary {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: registry.instance_id().to_string(),
            },
            session_id: session_id.clone(),
            events_ingested,
            metrics,
            insight,
        });
    }

    print!("{}", format_output(&summaries, &output_format)?);
    Ok(())
}

fn parse_records(input: &str) -> Result<Vec<ReplayRecord>, PulseCliError> {
    let mut records = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(trimmed).map_err(|e| {
            PulseCliError::ParseError(format!("Line {}: {e}", line_no + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn cmd_doctor(recording: Option<&std::path::Path>, json: bool) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Mindpulse version {ENGINE_VERSION}"),
    });

    if let Some(recording_path) = recording {
        if recording_path.exists() {
            match fs::read_to_string(recording_path) {
                Ok(content) => match parse_records(&content) {
                    Ok(records) => {
                        checks.push(DoctorCheck {
                            name: "recording".to_string(),
                            status: CheckStatus::Ok,
                            message: format!("Recording valid ({} records)", records.len()),
                        });
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "recording".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid recording: {}", CliError::from(e).message),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "recording".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read recording file: {e}"),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "recording".to_string(),
                status: CheckStatus::Warning,
                message: "Recording file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Doctor Report");
        println!("===================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn format_output(
    summaries: &[SessionSummary],
    format: &OutputFormat,
) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for summary in summaries {
                lines.push(serde_json::to_string(summary)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(summaries)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(summaries)?),
    }
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Telemetry(mindpulse::TelemetryError),
    NoRecords,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

impl From<mindpulse::TelemetryError> for PulseCliError {
    fn from(e: mindpulse::TelemetryError) -> Self {
        PulseCliError::Telemetry(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::Telemetry(e) => CliError {
                code: "TELEMETRY_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check session ids and event types in the recording".to_string()),
            },
            PulseCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No replay records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            PulseCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Expected NDJSON records with sessionId, eventType, atMs".to_string()),
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
