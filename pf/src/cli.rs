//! CLI command definitions and subcommands

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::MappingConfig;
use crate::domain::{PlanId, VenueId};

/// Pathfinder - plan an evening out, one stop at a time
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Find venues along a walking route and save evening plans",
    version = env!("CARGO_PKG_VERSION"),
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

    /// Output format for command results
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Subcommand to execute (none launches the interactive wizard)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login {
        /// Account email
        email: String,

        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        /// Display name
        name: String,

        /// Account email
        email: String,

        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Browse and rate venues
    Venues {
        #[command(subcommand)]
        command: VenuesCommand,
    },

    /// List the attributes venues can be filtered by
    Attributes,

    /// Browse saved plans
    Plans {
        #[command(subcommand)]
        command: PlansCommand,
    },

    /// Build and save a plan without the interactive wizard
    Plan(PlanArgs),

    /// Look up places matching free text
    Geocode {
        /// Text to search for
        text: String,
    },
}

/// Venue subcommands
#[derive(Debug, Subcommand)]
pub enum VenuesCommand {
    /// List all venues
    List,

    /// Search venues by name
    Search {
        /// Name (or part of a name) to search for
        name: String,
    },

    /// Show one venue
    Show { id: VenueId },

    /// Rate a venue from 1 to 5 stars
    Rate {
        id: VenueId,

        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },

    /// Show your rating of a venue
    Rating { id: VenueId },

    /// List your favourite venues
    Favourites,
}

/// Plan subcommands
#[derive(Debug, Subcommand)]
pub enum PlansCommand {
    /// List public plans
    Public,

    /// Show a random public plan
    Random,

    /// Show one plan with its venues
    Show { id: PlanId },

    /// Show the walking route through a plan
    Route { id: PlanId },
}

/// Arguments of the scripted wizard
#[derive(Debug, Clone, clap::Args)]
pub struct PlanArgs {
    /// Start location (free text, resolved to the best geocoding match)
    #[arg(long)]
    pub start: String,

    /// End location (free text, resolved to the best geocoding match)
    #[arg(long)]
    pub end: String,

    /// One stop's attributes, comma separated; repeat for more stops
    #[arg(long = "stop", required = true)]
    pub stops: Vec<StopArg>,

    /// Plan name (defaults to the configured default name)
    #[arg(long)]
    pub name: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Start time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Show the suggestions without saving
    #[arg(long)]
    pub dry_run: bool,
}

/// One `--stop` value: the attribute tags of a single stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopArg(pub Vec<String>);

impl std::str::FromStr for StopArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tags: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            return Err("a stop needs at least one attribute".to_string());
        }
        Ok(Self(tags))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{} (use YYYY-MM-DD)", e))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("{} (use HH:MM)", e))
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pathfinder")
        .join("logs")
        .join("pathfinder.log")
}

/// Generate the after_help text with the mapping token check and log location
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let token_env = MappingConfig::default().access_token_env;
    let token_set = std::env::var(&token_env).is_ok_and(|v| !v.is_empty());

    let mut help = String::new();
    help.push_str("Location search:\n");
    let icon = if token_set { "\u{2705}" } else { "\u{274C}" };
    let status = if token_set { "set" } else { "not set" };
    help.push_str(&format!("  {} {:<20} {}\n", icon, token_env, status));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
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
