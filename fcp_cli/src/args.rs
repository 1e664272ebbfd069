//! Command-line arguments.
//!
//! Values not given on the command line fall back to the saved config.

use clap::{Args, Parser, Subcommand};
use fcp_core::{CategorySet, Format};
use std::path::PathBuf;

/// fcp - copy signed social-graph records between hubs and files.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the records stored in an export file.
    Inspect(InspectArgs),
    /// Re-frame an export file, optionally filtering and resigning records.
    Convert(ConvertArgs),
    /// Parse a source or destination and print what it refers to.
    Endpoint {
        /// `fc://host:port/id`, `fc+ssl://host:port/id`, `-` or a path
        target: String,
    },
    /// Print the active config, or write the defaults with --init.
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Export file, or `-` for stdin
    pub file: String,

    /// Print per-category counts instead of the records
    #[arg(long)]
    pub stats: bool,

    /// Encoding of the file (binary or json)
    #[arg(long)]
    pub format: Option<Format>,

    #[command(flatten)]
    pub categories: CategoryArgs,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Source file, or `-` for stdin
    pub src: String,

    /// Destination file, or `-` for stdout
    pub dst: String,

    /// Encoding of the source (binary or json)
    #[arg(long)]
    pub from: Option<Format>,

    /// Encoding of the destination (binary or json)
    #[arg(long)]
    pub to: Option<Format>,

    /// Resign records with this hex Ed25519 seed
    #[arg(long, conflicts_with = "app_key_file")]
    pub app_key: Option<String>,

    /// Read the hex app key from a file
    #[arg(long)]
    pub app_key_file: Option<PathBuf>,

    #[command(flatten)]
    pub categories: CategoryArgs,
}

/// Per-category switches: bare `--casts` enables, `--reactions=false` disables
#[derive(Args, Debug, Default)]
pub struct CategoryArgs {
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub casts: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub reactions: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub links: Option<bool>,
}

impl CategoryArgs {
    /// Override the configured set with whatever was given explicitly
    pub fn apply(&self, mut set: CategorySet) -> CategorySet {
        if let Some(casts) = self.casts {
            set.casts = casts;
        }
        if let Some(reactions) = self.reactions {
            set.reactions = reactions;
        }
        if let Some(links) = self.links {
            set.links = links;
        }
        set
    }
}
