//! Clap argument definitions for the `chatdex` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "chatdex")]
#[command(about = "Full-text search over chat messages, one index per group")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `chatdex index`.
#[derive(Args, Debug, Clone)]
pub struct IndexCommand {
    /// File of JSON lines, one message per line (reads stdin when omitted)
    pub file: Option<PathBuf>,

    /// Write messages one at a time instead of as a batch
    #[arg(long)]
    pub single: bool,
}

/// Arguments for `chatdex delete`.
#[derive(Args, Debug, Clone)]
pub struct DeleteCommand {
    /// Group id
    #[arg(allow_negative_numbers = true)]
    pub group: i64,

    /// Message id
    #[arg(allow_negative_numbers = true)]
    pub message: i64,
}

/// Arguments for `chatdex exists`.
#[derive(Args, Debug, Clone)]
pub struct ExistsCommand {
    /// Group id
    #[arg(allow_negative_numbers = true)]
    pub group: i64,
}

/// Arguments for `chatdex search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Query text; an empty string matches every message
    pub query: String,

    /// Search a single group instead of every group
    #[arg(short = 'g', long, allow_negative_numbers = true)]
    pub group: Option<i64>,

    /// Read the query as boolean syntax (AND, OR, NOT, groups, phrases, field:value)
    #[arg(long)]
    pub syntax: bool,

    /// Matches to skip
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Maximum matches to return [default: from config]
    #[arg(long)]
    pub take: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `chatdex snippet`.
#[derive(Args, Debug, Clone)]
pub struct SnippetCommand {
    /// Message text
    pub text: String,

    /// Query to locate in the text
    pub query: String,

    /// Snippet length in characters [default: from config]
    #[arg(short = 'n', long)]
    pub length: Option<usize>,
}

/// Arguments for `chatdex init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global config (~/.chatdex.toml) instead of local
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Index messages from JSON lines
    Index(IndexCommand),

    /// Remove one message from a group's index
    Delete(DeleteCommand),

    /// Check whether a group has an index (exit status 0 when it does)
    Exists(ExistsCommand),

    /// Search messages in one group or across all groups
    Search(SearchCommand),

    /// Print the excerpt of a text that best matches a query
    Snippet(SnippetCommand),

    /// Create a .chatdex.toml configuration file
    Init(InitCommand),

    /// Show configuration files, index root, groups and document counts
    Status,

    /// Show effective configuration settings
    Config,
}
