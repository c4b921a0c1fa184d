//! Clap derive structures for the `siteplan` CLI.
//!
//! Defines the command tree, global flags, and shared types. Kept free
//! of workspace crates so `build.rs` can compile it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// siteplan -- radio coverage planning against a SPLAT! prediction service
#[derive(Debug, Parser)]
#[command(
    name = "siteplan",
    version,
    about = "Plan radio coverage from the command line",
    long_about = "Submit coverage predictions to a SPLAT! prediction service, wait for\n\
        them to finish, and collect the resulting GeoTIFF rasters as overlays.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "SITEPLAN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Prediction service URL (overrides profile)
    #[arg(long, short = 's', env = "SITEPLAN_SERVICE", global = true)]
    pub service: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SITEPLAN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SITEPLAN_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SITEPLAN_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a coverage prediction and save its overlay
    #[command(alias = "run")]
    Predict(PredictArgs),

    /// Check the status of a submitted prediction
    Status(StatusArgs),

    /// Download the raster of a finished prediction
    Result(ResultArgs),

    /// Show the effective simulation parameters
    Params(ParamsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PARAMETERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Simulation parameter overrides, applied on top of the profile's
/// defaults (or a `--params` file).
#[derive(Debug, Default, Args)]
pub struct ParamOverrides {
    /// JSON file with a full or partial parameter set
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Site name
    #[arg(long, help_heading = "Transmitter")]
    pub name: Option<String>,

    /// Transmitter latitude (degrees)
    #[arg(long, allow_hyphen_values = true, help_heading = "Transmitter")]
    pub lat: Option<f64>,

    /// Transmitter longitude (degrees)
    #[arg(long, allow_hyphen_values = true, help_heading = "Transmitter")]
    pub lon: Option<f64>,

    /// Transmitter power (W)
    #[arg(long, help_heading = "Transmitter")]
    pub power: Option<f64>,

    /// Frequency (MHz)
    #[arg(long, help_heading = "Transmitter")]
    pub frequency: Option<f64>,

    /// Transmitter antenna height (m)
    #[arg(long, help_heading = "Transmitter")]
    pub tx_height: Option<f64>,

    /// Transmitter antenna gain (dBi)
    #[arg(long, help_heading = "Transmitter")]
    pub tx_gain: Option<f64>,

    /// Receiver sensitivity (dBm)
    #[arg(long, allow_hyphen_values = true, help_heading = "Receiver")]
    pub sensitivity: Option<f64>,

    /// Receiver antenna height (m)
    #[arg(long, help_heading = "Receiver")]
    pub rx_height: Option<f64>,

    /// Receiver antenna gain (dBi)
    #[arg(long, help_heading = "Receiver")]
    pub rx_gain: Option<f64>,

    /// System loss (dB)
    #[arg(long, help_heading = "Receiver")]
    pub loss: Option<f64>,

    /// Radio climate (e.g. continental_temperate, maritime_temperate_sea)
    #[arg(long, help_heading = "Environment")]
    pub climate: Option<String>,

    /// Antenna polarization (horizontal, vertical)
    #[arg(long, help_heading = "Environment")]
    pub polarization: Option<String>,

    /// Ground clutter height (m)
    #[arg(long, help_heading = "Environment")]
    pub clutter: Option<f64>,

    /// Simulation radius (km)
    #[arg(long, help_heading = "Simulation")]
    pub extent: Option<f64>,

    /// Use high-resolution terrain data
    #[arg(long, help_heading = "Simulation")]
    pub high_resolution: bool,

    /// Color scale (plasma, viridis, turbo, ...)
    #[arg(long, help_heading = "Display")]
    pub color_scale: Option<String>,

    /// Overlay transparency (%)
    #[arg(long, help_heading = "Display")]
    pub transparency: Option<f64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PREDICT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub overrides: ParamOverrides,

    /// Directory that receives overlay rasters
    #[arg(long, short = 'd', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Submit only: print the task id and return
    #[arg(long)]
    pub no_wait: bool,

    /// Time between status checks (e.g. 500ms, 2s)
    #[arg(long, value_name = "DURATION")]
    pub poll_interval: Option<humantime::Duration>,

    /// Give up after this many status checks
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Give up after waiting this long (e.g. 10m)
    #[arg(long, value_name = "DURATION")]
    pub deadline: Option<humantime::Duration>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / RESULT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Task id returned by `predict --no-wait`
    pub task_id: String,
}

#[derive(Debug, Args)]
pub struct ResultArgs {
    /// Task id returned by `predict --no-wait`
    pub task_id: String,

    /// Where to write the GeoTIFF
    #[arg(long, short = 'f', value_name = "PATH")]
    pub output_file: PathBuf,

    /// Wait for the task to finish first
    #[arg(long, short = 'w')]
    pub wait: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PARAMS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub overrides: ParamOverrides,

    /// Also check the parameters against the service's limits
    #[arg(long)]
    pub validate: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a value in the active profile
    Set {
        /// Key: service, ca_cert, insecure, timeout, poll_interval_ms,
        /// max_attempts, deadline_secs
        key: String,
        /// Value to store
        value: String,
    },

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
