//! Clap derive structures for the `isoft` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// isoft -- read and control a Judo i-soft water softener
#[derive(Debug, Parser)]
#[command(
    name = "isoft",
    version,
    about = "Read and control Judo i-soft water softeners",
    long_about = "Talks to the softener's local HTTPS control port (8124).\n\n\
        Logs in, connects to the unit and recovers dropped sessions on\n\
        its own; every command is a single fresh request cycle.",
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
    /// Device profile to use
    #[arg(long, short = 'p', env = "ISOFT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device host or IP address (overrides profile)
    #[arg(long, env = "ISOFT_HOST", global = true)]
    pub host: Option<String>,

    /// Control port (overrides profile)
    #[arg(long, env = "ISOFT_PORT", global = true)]
    pub port: Option<u16>,

    /// Full endpoint URL, e.g. a TLS-terminating proxy in front of the unit
    #[arg(long, env = "ISOFT_URL", global = true, hide = true)]
    pub url: Option<Url>,

    /// Device user name (overrides profile)
    #[arg(long, short = 'u', env = "ISOFT_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ISOFT_OUTPUT",
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

    /// Per-attempt timeout in seconds (overrides profile)
    #[arg(long, env = "ISOFT_TIMEOUT", global = true)]
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
    /// Plain `key=value` lines (scripting)
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
    /// Show water totals, valve and vacation state
    #[command(alias = "st")]
    Status,

    /// Change a device setting
    Set(SetArgs),

    /// Verify credentials and connectivity
    Check,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub command: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Open or close the water-stop valve
    Valve {
        state: ValveState,
    },

    /// Turn vacation mode on or off
    Vacation {
        state: Toggle,
    },

    /// Send a raw actuator key/value pair (valve_mode, vacation_mode)
    Raw {
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValveState {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (passwords redacted)
    Show,

    /// Store a device password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
