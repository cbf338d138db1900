//! Command-line surface for `lineage`.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use lineage_types::TimeZoneSetting;

#[derive(Parser, Debug)]
#[command(
    name = "lineage",
    version,
    about = "Browse and record the history of versioned JSON datasets",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Defaults to the interactive shell.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Database file (defaults to ~/.lineage/lineage.db)
    #[arg(long, global = true, env = "LINEAGE_DB")]
    pub db: Option<PathBuf>,

    /// Commits rendered concurrently by `log`
    #[arg(long, short = 'j', global = true)]
    pub parallelism: Option<NonZeroUsize>,

    /// Disable ANSI colours
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Never start a pager
    #[arg(long, global = true)]
    pub no_pager: bool,

    /// Time zone for commit dates: local, utc, or an offset like +05:30
    #[arg(long, global = true)]
    pub tz: Option<TimeZoneSetting>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive command loop
    Shell,
    /// Show the commit history of a dataset
    Log(LogArgs),
    /// Print the value a spec refers to (`dataset.path` or `#hash.path`)
    Show { spec: String },
    /// List datasets, optionally filtered by a regular expression
    Ds { pattern: Option<String> },
    /// Record a new commit on a dataset
    Commit(CommitArgs),
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    pub dataset: String,

    /// Multi-line output with dates, messages, and values
    #[arg(long, short = 'v', conflicts_with = "oneline")]
    pub verbose: bool,

    /// One line per commit (the default)
    #[arg(long)]
    pub oneline: bool,

    /// Draw the ancestry graph (on by default in one-line mode)
    #[arg(long, conflicts_with = "no_graph")]
    pub graph: bool,

    /// Never draw the ancestry graph
    #[arg(long)]
    pub no_graph: bool,

    /// Stop after N commits; zero or negative means no limit
    #[arg(long = "max", short = 'n', allow_negative_numbers = true)]
    pub max_nodes: Option<i64>,

    /// Render this path of each commit instead of `.value`
    #[arg(long)]
    pub path: Option<String>,

    /// Limit the value shown per commit in verbose mode
    #[arg(long)]
    pub max_lines: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CommitArgs {
    pub dataset: String,

    /// JSON value to commit
    pub value: String,

    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Additional parent commits (hex hashes)
    #[arg(long = "merge")]
    pub merge: Vec<String>,
}
