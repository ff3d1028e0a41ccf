//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// refcache - Indexed XML cross-reference cache
#[derive(Parser)]
#[command(name = "refcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (JSON, or XML with a .xml extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Abort on the first error diagnostic
    #[arg(long, global = true)]
    pub strict: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every configured index and report statistics
    Index,

    /// Print the fragment stored under a key
    Lookup {
        /// Index name
        index: String,

        /// Key to look up
        key: String,
    },

    /// Apply the configured copy commands to a document
    Copy {
        /// Document to copy into
        #[arg(short, long)]
        document: PathBuf,

        /// Topic key bound to $key
        #[arg(short, long)]
        key: String,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
