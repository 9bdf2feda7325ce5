//! CLI command definitions and subcommands

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::BudgetLevel;

/// TripWeaver - trip planning client
#[derive(Parser)]
#[command(
    name = "tw",
    about = "Plan trips against a TripWeaver planning service and export itineraries",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a trip, printing progress as the service reports it
    Plan(PlanArgs),

    /// Render a saved plan as a PDF itinerary
    Export {
        /// Plan JSON written by `tw plan --save`
        #[arg(value_name = "PLAN_JSON")]
        input: PathBuf,

        /// Output file or directory (defaults to the configured output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the planning service is reachable
    Health,
}

/// Arguments for `tw plan`
#[derive(Debug, Clone, clap::Args)]
pub struct PlanArgs {
    /// Departure city or airport
    #[arg(long)]
    pub origin: String,

    /// Destination city
    #[arg(long)]
    pub destination: String,

    /// First day of the trip (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: NaiveDate,

    /// Last day of the trip (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: NaiveDate,

    /// Number of adults (1-8)
    #[arg(long, default_value = "2")]
    pub adults: u8,

    /// Budget tier (low, mid, high)
    #[arg(long, default_value = "mid")]
    pub budget: BudgetLevel,

    /// Trip type tag (e.g. honeymoon, family, business)
    #[arg(long, default_value = "custom")]
    pub trip_type: String,

    /// Interest tag; repeat for several
    #[arg(short, long = "interest", value_name = "TAG")]
    pub interests: Vec<String>,

    /// Extra constraint as key=value; repeat for several
    #[arg(long = "constraint", value_name = "KEY=VALUE", value_parser = parse_constraint)]
    pub constraints: Vec<(String, String)>,

    /// Write the PDF itinerary to this file or directory
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Save the plan (and request) as JSON for a later `tw export`
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Output format for the finished plan
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse a `key=value` constraint
pub fn parse_constraint(s: &str) -> Result<(String, String), String> {
    debug!(%s, "parse_constraint: called");
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => {
            debug!(%s, "parse_constraint: missing key or '='");
            Err(format!("Invalid constraint '{}': expected key=value", s))
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripweaver")
        .join("logs")
        .join("tripweaver.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with config and log locations
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Config is read from (first found):\n");
    help.push_str("  --config PATH\n");
    help.push_str("  ./.tripweaver.yml\n");
    if let Some(config_dir) = dirs::config_dir() {
        help.push_str(&format!("  {}\n", config_dir.join("tripweaver").join("tripweaver.yml").display()));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));

    debug!("generate_after_help: returning help text");
    help
}

/// Output format for the plan command
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => {
                debug!("OutputFormat::from_str: matched Text");
                Ok(Self::Text)
            }
            "json" => {
                debug!("OutputFormat::from_str: matched Json");
                Ok(Self::Json)
            }
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
