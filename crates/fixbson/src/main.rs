//! Command-line front end for the BSON length-fixing pass.
//!
//! A BSON file written by a forward-only encoder carries zero placeholders
//! where its container lengths belong. This tool patches them in place:
//!
//! ```bash
//! fixbson output.bson
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "fixbson", version, about = "Fix container lengths of a BSON file in place")]
struct Args {
    /// The BSON file to fix.
    file: PathBuf,

    /// Enable debug output.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    tracing::debug!("fixing {}", args.file.display());
    match jbson::fix_lengths(&args.file) {
        Ok(()) => {
            tracing::debug!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fixbson: {e}");
            ExitCode::FAILURE
        }
    }
}
