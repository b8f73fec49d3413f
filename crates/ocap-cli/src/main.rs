//! Command-line tools for marshalled messages
//!
//! Reads a `{"body": ..., "slots": [...]}` message from a file or stdin.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ocap_cli::commands::{self, key, sort, transcode};
use ocap_marshal::BodyFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocap")]
#[command(about = "Inspect and convert marshalled passables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Marshal options file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Capdata,
    Smallcaps,
}

impl From<Format> for BodyFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Capdata => BodyFormat::Capdata,
            Format::Smallcaps => BodyFormat::Smallcaps,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode a message in another body format
    Transcode {
        /// Output format; defaults to the configured body format
        #[arg(long)]
        to: Option<Format>,

        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Print the order-preserving key of a message's value
    Key {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Rank-sort a JSON array of messages by their decoded values
    Sort {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_writer(std::io::stderr)
        .init();

    let options = commands::load_options(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Transcode { to, file } => {
            let input = commands::read_input(file.as_deref())?;
            let to = to.map_or(options.body_format, BodyFormat::from);
            transcode::run(&input, to, &options)?
        }
        Commands::Key { file } => key::run(&commands::read_input(file.as_deref())?)?,
        Commands::Sort { file } => sort::run(&commands::read_input(file.as_deref())?)?,
    };
    println!("{output}");

    Ok(())
}
