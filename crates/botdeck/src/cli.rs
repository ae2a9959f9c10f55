//! Clap derive structures for the `botdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// botdeck -- operator console for the chat-bot admin server
#[derive(Debug, Parser)]
#[command(
    name = "botdeck",
    version,
    about = "Operate a chat bot through its admin server",
    long_about = "Start and stop the bot, watch its status and logs, edit its\n\
        configuration and the tracked member roster, all through the\n\
        admin server's HTTP API and live log channel.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "BOTDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Admin server URL (overrides profile)
    #[arg(long, short = 'u', env = "BOTDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BOTDECK_OUTPUT",
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "BOTDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BOTDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Show the bot process status
    #[command(alias = "st")]
    Status,

    /// Show today's message counters
    Stats,

    /// Start, stop, or restart the bot
    Bot(BotArgs),

    /// View and edit the bot's configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// View and edit tracked group members
    #[command(alias = "m")]
    Members(MembersArgs),

    /// Print the bot's log output
    Logs(LogsArgs),

    /// Live status line until interrupted
    Watch,

    /// Manage botdeck's own server profiles
    Profile(ProfileArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Bot ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BotArgs {
    #[command(subcommand)]
    pub command: BotCommand,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum BotCommand {
    /// Start the bot process
    Start,
    /// Stop the bot process
    Stop,
    /// Stop and start the bot process
    Restart,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the configuration, merged over the defaults
    Show {
        /// Only this top-level section (e.g., "ai", "personality")
        #[arg(long, short = 's')]
        section: Option<String>,
    },

    /// Print one value by dotted path
    Get {
        /// Dotted path, e.g., "bot.qq_number"
        path: String,
    },

    /// Set one value by dotted path and save
    Set {
        /// Dotted path, e.g., "ai.temperature"
        path: String,

        /// JSON value; anything that is not valid JSON is taken as a string
        value: String,

        /// Save even if validation reports errors
        #[arg(long)]
        force: bool,
    },

    /// Show or replace the personality traits
    Traits {
        /// New traits, separated by newlines or ';'
        #[arg(long)]
        set: Option<String>,

        /// Save even if validation reports errors
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration without saving
    Validate,

    /// Manage the bot's secret environment variables
    Env(EnvArgs),
}

#[derive(Debug, Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommand,
}

#[derive(Debug, Subcommand)]
pub enum EnvCommand {
    /// Show env keys with masked values
    Show,

    /// Set a secret (prompted, never echoed) and save
    Set {
        /// Variable name, e.g., DEEPSEEK_API_KEY
        key: String,

        /// Save even if validation reports errors
        #[arg(long)]
        force: bool,
    },
}

// ── Members ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MembersArgs {
    #[command(subcommand)]
    pub command: MembersCommand,
}

#[derive(Debug, Subcommand)]
pub enum MembersCommand {
    /// List tracked members
    #[command(alias = "ls")]
    List,

    /// Change one member and save
    Edit(MemberEditArgs),
}

#[derive(Debug, Args)]
pub struct MemberEditArgs {
    /// QQ number of the member
    pub qq: String,

    #[arg(long)]
    pub nickname: Option<String>,

    #[arg(long)]
    pub group_card: Option<String>,

    /// Birthday, free form (e.g., "03-14")
    #[arg(long)]
    pub birthday: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Mark the member active
    #[arg(long, conflicts_with = "inactive")]
    pub active: bool,

    /// Mark the member inactive
    #[arg(long)]
    pub inactive: bool,
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Keep printing new lines from the live channel
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Only the short recent window
    #[arg(long, short = 'r')]
    pub recent: bool,
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the active (or named) profile
    Show {
        /// Profile name
        name: Option<String>,
    },

    /// Print the config file path
    Path,

    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,

        /// Admin server URL
        #[arg(long)]
        url: String,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
