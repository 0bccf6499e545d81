use crate::config::{DEFAULT_ADDR, DEFAULT_HISTORY_DB, DEFAULT_OUTPUT_DIR, DEFAULT_STORAGE_DIR};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the catalog files
    Serve {
        /// Directory holding the files listed in the catalog
        #[arg(long, default_value = DEFAULT_STORAGE_DIR)]
        root: PathBuf,
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
    },
    /// Print the server's catalog
    List {
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
    },
    /// Download a file (prompts when no name is given)
    Get {
        /// File to download
        name: Option<String>,
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
        /// Directory to save downloads into
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Download history database
        #[arg(long, default_value = DEFAULT_HISTORY_DB)]
        history: PathBuf,
    },
    /// Show download history
    History {
        /// Download history database
        #[arg(long, default_value = DEFAULT_HISTORY_DB)]
        history: PathBuf,
    },
}
