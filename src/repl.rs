//! Line-based interactive console.

use crate::errors::Error;
use crate::session::Session;
use crate::sql;
use crossterm::style::Stylize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER: &str = r#"
Statements end with an optional ';'. Type '.help' for help, '.exit' to quit.
"#;

const HELP: &str = r#"Statements:
  insert <key> <value>   store a value under a new key
  find <key>             print the value stored under a key
  update <key> <value>   replace a value in place (it may not grow)
  delete <key>           remove a key

Commands:
  .help      show this help
  .history   show previously entered statements
  .tree      dump the index node structure
  .exit      quit (also .quit)
"#;

/// Runs the console until EOF or `.exit`.
pub fn start(index_path: &Path, data_path: &Path) -> Result<(), Error> {
    let mut session = Session::open(index_path, data_path)?;
    println!("{} {}", NAME, VERSION);
    println!("{}", BANNER);

    let history_path = history_file();
    if let Some(path) = &history_path {
        if let Err(e) = ensure_history_file(path) {
            warn!("Failed to create history file: {}", e);
        }
    }

    let stdin = io::stdin();
    loop {
        print!("{} ", format!("{}>", NAME).dark_green());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Some(path) = &history_path {
            if let Err(e) = append_history(input, path) {
                warn!("Failed to append history: {}", e);
            }
        }

        if let Some(command) = input.strip_prefix('.') {
            match command {
                "exit" | "quit" => break,
                "help" => println!("{}", HELP),
                "history" => {
                    for entry in history_path.as_deref().map(load_history).unwrap_or_default() {
                        println!("{}", entry);
                    }
                }
                "tree" => match session.tree.dump() {
                    Ok(lines) => {
                        for line in lines {
                            println!("{}", line);
                        }
                    }
                    Err(e) => println!("{}", format!("Error: {}", e).red()),
                },
                other => println!("Unknown command '.{}'. Type '.help' for help.", other),
            }
            continue;
        }

        match sql::execute(&mut session.tree, input) {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                error!("Statement failed: {}", e);
                println!("{}", format!("Error: {}", e).red());
            }
        }
    }

    session.close()
}

/// Where per-user statement history lives.
fn history_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{}_history", NAME)))
}

fn ensure_history_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        File::create(path)?;
    }
    Ok(())
}

/// Loads previously entered statements; a missing or unreadable file is
/// just an empty history.
fn load_history(path: &Path) -> Vec<String> {
    match File::open(path) {
        Ok(file) => BufReader::new(file)
            .lines()
            .filter_map(Result::ok)
            .filter(|line| !line.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn append_history(line: &str, path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{}", line)
}
