//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::NodeId;

/// Hierarchical notes in a single SQLite file, with per-note encryption
#[derive(Parser, Debug)]
#[command(name = "notetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Database file (overrides config)
    #[arg(long, global = true, env = "NOTETREE_DB", value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Extra config file applied on top of the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List children of a folder (root when omitted)
    Ls {
        /// Folder id
        parent: Option<NodeId>,
    },

    /// Show the whole hierarchy as a tree
    Tree,

    /// Create a folder
    Mkdir {
        name: String,
        /// Parent folder id
        #[arg(short, long, default_value = "0")]
        parent: NodeId,
    },

    /// Create an empty file
    New {
        name: String,
        /// Parent folder id
        #[arg(short, long, default_value = "0")]
        parent: NodeId,
    },

    /// Rename a node
    Rename { id: NodeId, name: String },

    /// Move a node into a folder (0 = root)
    Mv { id: NodeId, target: NodeId },

    /// Copy a node (deep for folders) into a folder (0 = root)
    Cp { id: NodeId, target: NodeId },

    /// Delete a node and everything beneath it
    Rm { id: NodeId },

    /// Print file content
    Cat {
        id: NodeId,
        /// Decrypt an encrypted file for display without changing it
        #[arg(long)]
        decrypt: bool,
        #[arg(long, env = "NOTETREE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Replace file content (from --file or stdin)
    Write {
        id: NodeId,
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Import a file from disk
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
        /// Parent folder id
        #[arg(short, long, default_value = "0")]
        parent: NodeId,
        /// Name in the tree (default: file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Export a file to disk (refused for encrypted files)
    Export {
        id: NodeId,
        /// Output directory or file (default: current directory)
        #[arg(short, long, value_hint = ValueHint::AnyPath)]
        output: Option<PathBuf>,
    },

    /// Find nodes by name (case-insensitive)
    Find { query: String },

    /// Encrypt a file with a password
    Encrypt {
        id: NodeId,
        #[arg(long, env = "NOTETREE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Decrypt a file permanently
    Decrypt {
        id: NodeId,
        #[arg(long, env = "NOTETREE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Inspect the edit journal
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Delete every note and journal entry
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum JournalCommands {
    /// Print all entries as JSON
    Export {
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
    /// Drop entries older than the retention window
    Prune,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template
    Template,
    /// Show the global config file location
    Path,
}
