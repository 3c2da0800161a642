//! Clap derive structures for the `reolink` CLI.
//!
//! Shared with `build.rs` for man page generation, so this file may only
//! depend on `clap` and `clap_complete`.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// reolink -- query and control Reolink cameras and NVRs
#[derive(Debug, Parser)]
#[command(
    name = "reolink",
    version,
    about = "Query and control Reolink cameras from the command line",
    long_about = "Talks to a camera's HTTP command API: device info, abilities,\n\
        clock, stream URLs, snapshots, IR lights, motion state and PTZ.\n\n\
        Over plain HTTP the login uses the camera's digest handshake and\n\
        encrypted payloads when the firmware supports it.",
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
    /// Camera profile to use
    #[arg(long, short = 'p', env = "REOLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Camera hostname or IP (overrides profile)
    #[arg(long, short = 'H', env = "REOLINK_HOST", global = true)]
    pub host: Option<String>,

    /// HTTP(S) port (overrides profile)
    #[arg(long, env = "REOLINK_PORT", global = true)]
    pub port: Option<u16>,

    /// Login user (overrides profile)
    #[arg(long, short = 'u', env = "REOLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Prompt for the password instead of resolving it from config
    #[arg(long, global = true)]
    pub ask_password: bool,

    /// Use HTTPS
    #[arg(long, global = true, conflicts_with = "http")]
    pub https: bool,

    /// Use plain HTTP even on port 443
    #[arg(long, global = true)]
    pub http: bool,

    /// Skip the digest handshake and send payloads in the clear
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "REOLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verify TLS certificates against the system store
    #[arg(long, global = true)]
    pub verify_tls: bool,

    /// Request timeout in seconds
    #[arg(long, env = "REOLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StreamArg {
    /// Main (high resolution) stream
    Main,
    /// Sub (low resolution) stream
    Sub,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show model, firmware and serial number
    Info,

    /// Show the abilities reported for a user
    Abilities(AbilitiesArgs),

    /// Show per-channel status (NVRs)
    #[command(alias = "ch")]
    Channels,

    /// Show the device clock and timezone
    Time,

    /// Show link info and service ports
    #[command(alias = "net")]
    Network,

    /// Print the RTSP URL of a channel
    RtspUrl(RtspUrlArgs),

    /// Save a JPEG snapshot
    #[command(alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Show or set the infrared lights
    Ir(IrArgs),

    /// Show motion and AI detection state
    #[command(alias = "md")]
    Motion(ChannelArg),

    /// Send a PTZ command
    Ptz(PtzArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChannelArg {
    /// Zero-based channel number
    #[arg(long, short = 'c', default_value = "0")]
    pub channel: u8,
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AbilitiesArgs {
    /// User to query (defaults to the login user)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Debug, Args)]
pub struct RtspUrlArgs {
    #[command(flatten)]
    pub channel: ChannelArg,

    /// Stream to address
    #[arg(long, short = 's', default_value = "main")]
    pub stream: StreamArg,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub channel: ChannelArg,

    /// Output file
    #[arg(long = "out", short = 'O', default_value = "snapshot.jpg")]
    pub out: std::path::PathBuf,
}

#[derive(Debug, Args)]
pub struct IrArgs {
    #[command(flatten)]
    pub channel: ChannelArg,

    /// New state: auto, on or off (omit to show the current one)
    pub state: Option<String>,
}

#[derive(Debug, Args)]
pub struct PtzArgs {
    #[command(flatten)]
    pub channel: ChannelArg,

    /// Operation, e.g. left, right, up, down, zoominc, zoomdec, stop
    pub op: String,

    /// Movement speed (1-64)
    #[arg(long)]
    pub speed: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration (passwords masked)
    Show,

    /// Print the config file location
    Path,

    /// List profile names
    Profiles,

    /// Store a profile's password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
