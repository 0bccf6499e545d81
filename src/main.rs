mod catalog;
mod cli;
mod client;
mod config;
mod error;
mod history;
mod protocol;
mod server;
mod storage;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use client::{Client, DownloadOutcome, Progress};
use error::TransferError;
use history::History;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCtrl+C pressed. Exiting...");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Serve { root, addr } => {
            server::run_server(root, &addr, cancel).await?;
        }
        Commands::List { addr } => {
            let Some(mut client) = connect(&addr).await else {
                std::process::exit(1);
            };
            let catalog = client.fetch_catalog().await?;
            print_catalog(&catalog);
        }
        Commands::Get {
            name,
            addr,
            output,
            history,
        } => {
            let history = History::open(&history)?;
            let Some(mut client) = connect(&addr).await else {
                std::process::exit(1);
            };
            print_catalog(client.catalog());

            match name {
                Some(name) => {
                    download(&mut client, &name, &output, &history, &cancel).await?;
                }
                None => interactive(&mut client, &output, &history, &cancel).await?,
            }
        }
        Commands::History { history } => {
            let history = History::open(&history)?;
            println!(
                "{:<5} {:<30} {:<10} {:<12} {:<20}",
                "ID", "Name", "Status", "Bytes", "Created At"
            );
            for r in history.list()? {
                println!(
                    "{:<5} {:<30} {:<10} {:<12} {:<20}",
                    r.id, r.name, r.status, r.bytes, r.created_at
                );
            }
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

async fn connect(addr: &str) -> Option<Client> {
    match Client::connect(addr).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Failed to connect to server: {}", e);
            None
        }
    }
}

fn print_catalog(catalog: &catalog::Catalog) {
    println!("Available files (approximate sizes):");
    for (file, size) in catalog {
        println!("{} - {}", file, size);
    }
}

/// Prompt until the user exits, stdin closes, or the session breaks.
async fn interactive(
    client: &mut Client,
    output: &Path,
    history: &History,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(b"Enter the name of the file you want to download (or 'exit' to quit): ")
            .await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        if name.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            return Ok(());
        }
        if !client.catalog().contains_key(name) {
            println!("File does not exist on the server. Try again!");
            continue;
        }

        if !download(client, name, output, history, cancel).await? {
            return Ok(());
        }
    }
}

/// Run one download and report it. Returns whether the session is still usable.
async fn download(
    client: &mut Client,
    name: &str,
    output: &Path,
    history: &History,
    cancel: &CancellationToken,
) -> Result<bool> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let result = client
        .download(name, output, cancel, |p| bar.set_message(progress_line(name, p)))
        .await;
    bar.finish_and_clear();

    let (status, bytes, usable) = match result {
        Ok(DownloadOutcome::Completed(bytes)) => {
            println!("Finished downloading {} ({} bytes).", name, bytes);
            ("Completed", bytes, true)
        }
        Ok(DownloadOutcome::NotFound) => {
            println!("Server: File not found - {}", name);
            ("NotFound", 0, true)
        }
        Ok(DownloadOutcome::IoError(detail)) => {
            println!("Error while downloading {}: {}", name, detail);
            ("IoError", 0, true)
        }
        Err(TransferError::Cancelled) => {
            println!("Download of {} cancelled.", name);
            ("Cancelled", 0, false)
        }
        Err(e) => {
            println!("Error while downloading {}: {}", name, e);
            ("Failed", 0, false)
        }
    };

    if let Err(e) = history.record(name, status, bytes) {
        warn!("Could not record download history: {}", e);
    }
    Ok(usable)
}

fn progress_line(name: &str, progress: &Progress) -> String {
    match progress.percent() {
        Some(pct) => format!("Downloading {} .... {:.0}%", name, pct),
        None => format!("Downloading {} .... {} bytes", name, progress.received),
    }
}
