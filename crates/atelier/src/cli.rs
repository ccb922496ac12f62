//! Clap derive structures for the `atelier` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// atelier -- workshop records from the command line
#[derive(Debug, Parser)]
#[command(
    name = "atelier",
    version,
    about = "Manage workshop clients, instruments, and their connections",
    long_about = "A CLI over the Atelier data store.\n\n\
        Reads go through a shared cache that fetches each record kind once,\n\
        writes are applied locally only after the backend confirms them.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "ATELIER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Project URL (overrides profile)
    #[arg(long, short = 'u', env = "ATELIER_URL", global = true)]
    pub url: Option<String>,

    /// Project API key
    #[arg(long, env = "ATELIER_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ATELIER_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ATELIER_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ATELIER_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Work against an empty in-process store instead of a backend
    #[arg(long, global = true)]
    pub offline: bool,
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
    /// Manage clients
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Manage instruments
    #[command(alias = "inst", alias = "i")]
    Instruments(InstrumentsArgs),

    /// Manage client-instrument connections
    #[command(alias = "conn")]
    Connections(ConnectionsArgs),

    /// Show connections joined with their client and instrument
    #[command(alias = "rel")]
    Relationships(RelationshipsArgs),

    /// Search clients, instruments, and connections
    Search(SearchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Shared paging and text filtering for list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive text filter over the record's searchable fields
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Fetch one page of at most this many rows straight from the backend
    #[arg(long, short = 'l')]
    pub limit: Option<u64>,

    /// Row offset for --limit
    #[arg(long, default_value = "0", requires = "limit")]
    pub offset: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLIENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List clients
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only clients carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Only clients with an email address
        #[arg(long)]
        with_email: bool,
    },

    /// Get client details
    Get {
        /// Client ID
        id: String,
    },

    /// Create a client
    Create(ClientFields),

    /// Update a client
    Update {
        /// Client ID
        id: String,

        #[command(flatten)]
        fields: ClientFields,
    },

    /// Delete a client
    #[command(alias = "rm")]
    Delete {
        /// Client ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct ClientFields {
    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub contact_number: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,

    #[arg(long)]
    pub interest: Option<String>,

    #[arg(long)]
    pub note: Option<String>,

    #[arg(long)]
    pub client_number: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INSTRUMENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InstrumentsArgs {
    #[command(subcommand)]
    pub command: InstrumentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstrumentsCommand {
    /// List instruments
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only instruments in this status (Available, Booked, Sold, ...)
        #[arg(long)]
        status: Option<String>,

        /// Only instruments by this maker
        #[arg(long)]
        maker: Option<String>,

        /// Only instruments of this type
        #[arg(long = "type")]
        type_: Option<String>,

        /// Only instruments with a certificate
        #[arg(long)]
        certified: bool,
    },

    /// Get instrument details, including its owner
    Get {
        /// Instrument ID
        id: String,
    },

    /// Create an instrument
    Create {
        /// Instrument type (Violin, Viola, Cello, Bow, ...)
        #[arg(long = "type")]
        type_: String,

        #[command(flatten)]
        fields: InstrumentFields,
    },

    /// Update an instrument
    Update {
        /// Instrument ID
        id: String,

        /// Instrument type
        #[arg(long = "type")]
        type_: Option<String>,

        #[command(flatten)]
        fields: InstrumentFields,
    },

    /// Delete an instrument
    #[command(alias = "rm")]
    Delete {
        /// Instrument ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct InstrumentFields {
    #[arg(long)]
    pub maker: Option<String>,

    #[arg(long)]
    pub subtype: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long)]
    pub serial_number: Option<String>,

    /// Available, Booked, Sold, Reserved, Maintenance, or free text
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub ownership: Option<String>,

    /// Whether the instrument has a certificate
    #[arg(long)]
    pub certificate: Option<bool>,

    #[arg(long)]
    pub note: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONNECTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConnectionsArgs {
    #[command(subcommand)]
    pub command: ConnectionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConnectionsCommand {
    /// List connections
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only connections for this client ID
        #[arg(long)]
        client: Option<String>,

        /// Only connections for this instrument ID
        #[arg(long)]
        instrument: Option<String>,

        /// Only connections of this relationship type
        #[arg(long)]
        relationship: Option<String>,

        /// Only connections missing a client or instrument reference
        #[arg(long)]
        orphaned: bool,
    },

    /// Get connection details
    Get {
        /// Connection ID
        id: String,
    },

    /// Link a client to an instrument
    Create {
        /// Client ID
        #[arg(long)]
        client: String,

        /// Instrument ID
        #[arg(long)]
        instrument: String,

        /// Interested, Booked, Sold, Owned, or free text
        #[arg(long, default_value = "Interested")]
        relationship: String,

        #[arg(long)]
        notes: Option<String>,

        /// Position among the client's connections (default: last)
        #[arg(long)]
        order: Option<i64>,
    },

    /// Update a connection
    Update {
        /// Connection ID
        id: String,

        #[arg(long)]
        relationship: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        order: Option<i64>,
    },

    /// Delete a connection
    #[command(alias = "rm")]
    Delete {
        /// Connection ID
        id: String,
    },

    /// Rewrite display order to follow the given ID sequence
    Reorder {
        /// Connection IDs in their new order
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RELATIONSHIPS / SEARCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RelationshipsArgs {
    /// Only relationships for this client ID
    #[arg(long, conflicts_with = "instrument")]
    pub client: Option<String>,

    /// Only relationships for this instrument ID
    #[arg(long)]
    pub instrument: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive; empty matches everything)
    #[arg(default_value = "")]
    pub query: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
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

    /// Set a profile value
    Set {
        /// Profile key (url, api_key_env, ca_cert, insecure, timeout, revalidate_interval)
        key: String,

        /// Value to set
        value: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
