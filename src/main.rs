// CLI binary entry point for chapsplit

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::commands::{command_batch, command_chapters, command_split};
use cli::{Commands, Config, OutputFormatter};

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config);

    let formatter = OutputFormatter::new(config.format.clone(), config.quiet);

    match &config.command {
        Commands::Split {
            file,
            output,
            lenient,
            dry_run,
        } => command_split(file, output.as_deref(), *lenient, *dry_run, &formatter),
        Commands::Chapters { files } => command_chapters(files, &formatter),
        Commands::Batch {
            directory,
            pattern,
            output,
            lenient,
        } => command_batch(directory, pattern, output.as_deref(), *lenient, &formatter),
    }
}

fn init_logging(config: &Config) {
    let default_filter = if config.verbose {
        "chapsplit=debug"
    } else if config.quiet {
        "chapsplit=warn"
    } else {
        "chapsplit=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
