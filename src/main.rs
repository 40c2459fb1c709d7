#[macro_use]
mod errors;
mod repl;
mod session;
mod sql;
mod storage;

use clap::Parser;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "kvlite",
    version = VERSION,
    about = "Tiny persistent key/value store."
)]
struct Cli {
    /// Path of the B+tree index file.
    #[arg(long, env = "KVLITE_INDEX_FILE", default_value = "kvlite.idx")]
    index_file: PathBuf,
    /// Path of the value heap file.
    #[arg(long, env = "KVLITE_DATA_FILE", default_value = "kvlite.db")]
    data_file: PathBuf,
    /// Path of the log file.
    #[arg(long, env = "KVLITE_LOG_FILE", default_value = "kvlite.log")]
    log_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match repl::start(&cli.index_file, &cli.data_file) {
        Ok(_) => (),
        Err(errors::Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => (), // Silence Ctrl+C
        Err(e) => println!("\nError: {}", e),
    }
}
