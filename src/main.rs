//! Command-line front end for the line store.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linestore::store::LineStore;

/// Line-oriented persistent text store with journaled crash recovery
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Store file to operate on
    file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print every row
    List,
    /// Print the row at INDEX
    Get { index: usize },
    /// Append a new row
    Add { text: String },
    /// Overwrite the row at INDEX
    Set { index: usize, text: String },
    /// Erase the row at INDEX
    Remove { index: usize },
    /// Erase every row
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut store = LineStore::open(&args.file)?;

    match args.command {
        Cmd::List => {
            for row in store.all() {
                println!("{row}");
            }
        }
        Cmd::Get { index } => println!("{}", store.read(index)?),
        Cmd::Add { text } => store.append(text)?,
        Cmd::Set { index, text } => store.overwrite(index, text)?,
        Cmd::Remove { index } => store.erase(index)?,
        Cmd::Clear => store.clear()?,
    }

    store.save()?;
    Ok(())
}
