//! Clap derive structures for the `franklinwh` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// franklinwh -- monitor and control a FranklinWH aGate from the command line
#[derive(Debug, Parser)]
#[command(
    name = "franklinwh",
    version,
    about = "Monitor and control FranklinWH home energy systems",
    long_about = "Polls a FranklinWH aGate through the cloud or local API and\n\
        forwards smart switch, operation mode, and battery reserve changes.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "FRANKLINWH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// aGate serial number (overrides profile)
    #[arg(long, short = 'g', env = "FRANKLINWH_GATEWAY", global = true)]
    pub gateway: Option<String>,

    /// Talk to the aGate at this host instead of the cloud (overrides profile)
    #[arg(long, env = "FRANKLINWH_LOCAL_HOST", global = true)]
    pub local_host: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FRANKLINWH_OUTPUT",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FRANKLINWH_TIMEOUT", global = true)]
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
    /// Fetch and show current power flows, totals, and switch state
    #[command(alias = "st")]
    Status,

    /// Poll continuously and print each new snapshot
    Watch(WatchArgs),

    /// Control the smart circuit switches
    #[command(alias = "sw")]
    Switches(SwitchesArgs),

    /// Change the operation mode
    Mode(ModeArgs),

    /// Change the battery reserve
    Reserve(ReserveArgs),

    /// Inspect configuration and store credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll period in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Switches ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwitchesArgs {
    #[command(subcommand)]
    pub command: SwitchesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SwitchesCommand {
    /// Set all three switches at once
    Set {
        /// Switch 1
        switch_1: SwitchPosition,
        /// Switch 2
        switch_2: SwitchPosition,
        /// Switch 3
        switch_3: SwitchPosition,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SwitchPosition {
    On,
    Off,
}

impl SwitchPosition {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Mode ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ModeArgs {
    #[command(subcommand)]
    pub command: ModeCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModeCommand {
    /// Switch operation mode: self_use, backup, time_of_use, clean_backup
    Set {
        /// Mode identifier
        mode: String,
    },
}

// ── Reserve ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReserveArgs {
    #[command(subcommand)]
    pub command: ReserveCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReserveCommand {
    /// Set the battery reserve percentage
    Set {
        /// Reserve percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Read a password from stdin and store it in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
