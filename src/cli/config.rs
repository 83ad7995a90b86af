// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// chapsplit - split chaptered MP3 files
#[derive(Parser, Debug)]
#[command(name = "chapsplit")]
#[command(about = "Split an MP3 into one file per ID3v2 chapter", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for summaries and chapter lists
#[derive(Debug, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split one file into per-chapter files
    Split {
        /// MP3 file with chapter frames
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep what was read when the input ends mid-frame
        #[arg(long)]
        lenient: bool,

        /// Show the files that would be written without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List the chapters stored in the leading tag
    Chapters {
        /// MP3 file path(s)
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Split every matching file in a directory
    Batch {
        /// Directory path
        #[arg(short, long)]
        directory: PathBuf,

        /// File pattern (e.g., "*.mp3")
        #[arg(short, long)]
        pattern: String,

        /// Output root; each file gets a sub-directory named after it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep what was read when an input ends mid-frame
        #[arg(long)]
        lenient: bool,
    },
}
