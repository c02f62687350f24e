//! Operator client for the monitor.
//!
//! It runs against the same configuration and store as the daemon:
//!
//! ```text
//! swarm_client scrape <INFO_HASH>...
//! cat hashes.txt | swarm_client scrape --stdin
//! swarm_client status <INFO_HASH>
//! swarm_client prune-claims --holdoff 3600
//! swarm_client add-trackers trackers.txt
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use swarmwatch_primitives::info_hash::InfoHash;
use tokio::io::AsyncBufReadExt as _;
use tracing::{error, info};
use url::Url;

use crate::bootstrap;
use crate::core::services::{self, RescrapeOutcome};
use crate::core::Watcher;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape specific swarms now, regardless of staleness scheduling.
    Scrape {
        /// Info-hashes to scrape, as 40-character hex strings.
        info_hashes: Vec<String>,

        /// Read info-hashes from standard input, one per line.
        #[clap(long)]
        stdin: bool,

        /// Scrape even when another worker claims the swarm. The claim set
        /// is left untouched.
        #[clap(long)]
        ignore_claims: bool,
    },

    /// Explain how the staleness evaluator currently sees one swarm.
    Status {
        /// Info-hash of the swarm, as a 40-character hex string.
        info_hash: String,
    },

    /// Remove claims that survive a holdoff re-check. Claims are
    /// time-unbounded, so a crashed worker leaves its hash claimed until
    /// this is run.
    PruneClaims {
        /// Seconds to wait before re-checking the claim set.
        #[clap(long, default_value_t = 3600)]
        holdoff: u64,
    },

    /// Append announce URLs from a file (one per line) to every stored
    /// swarm record.
    AddTrackers {
        /// File with one announce URL per line.
        file: PathBuf,
    },
}

/// It runs the console client.
///
/// # Errors
///
/// Will return an error if the command's input is unusable (bad hash, bad
/// file) or the store cannot be reached.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let configuration = std::sync::Arc::new(bootstrap::config::initialize_configuration());
    let watcher = bootstrap::app::initialize_with_configuration(&configuration);

    match args.command {
        Command::Scrape {
            info_hashes,
            stdin,
            ignore_claims,
        } => {
            let raw_hashes = if stdin { read_lines_from_stdin().await? } else { info_hashes };
            anyhow::ensure!(!raw_hashes.is_empty(), "no info-hashes given");

            scrape_all(&watcher, &raw_hashes, ignore_claims).await
        }
        Command::Status { info_hash } => {
            let info_hash = parse_info_hash(&info_hash)?;

            let status = services::swarm_status(&watcher, &info_hash).await?;

            println!("{}", serde_json::to_string_pretty(&status).expect("a status report should be JSON serializable"));

            Ok(())
        }
        Command::PruneClaims { holdoff } => prune_claims(&watcher, holdoff).await,
        Command::AddTrackers { file } => {
            let announces = read_announce_file(&file)?;

            let added = services::append_trackers(&watcher, &announces).await?;

            println!("Added {added} tracker entries");

            Ok(())
        }
    }
}

async fn scrape_all(watcher: &Watcher, raw_hashes: &[String], ignore_claims: bool) -> anyhow::Result<()> {
    let total = raw_hashes.len();

    for (index, raw) in raw_hashes.iter().enumerate() {
        let info_hash = parse_info_hash(raw)?;

        info!("Scraping {info_hash} [{}/{total}]", index + 1);

        // One bad swarm must not abort the whole batch.
        match services::scrape_one(watcher, &info_hash, ignore_claims).await {
            Ok(RescrapeOutcome::Scraped { persisted }) => {
                if persisted {
                    info!("Finished, record updated");
                } else {
                    info!("Finished, nothing was stale");
                }
            }
            Ok(RescrapeOutcome::AlreadyClaimed) => {}
            Err(err) => error!("Scraping {info_hash} failed: {err}"),
        }
    }

    Ok(())
}

async fn prune_claims(watcher: &Watcher, holdoff: u64) -> anyhow::Result<()> {
    let snapshot = watcher.claims.claimed().await?;

    if snapshot.is_empty() {
        info!("No claims to prune");
        return Ok(());
    }

    info!("Re-checking {} claims after {holdoff}s ...", snapshot.len());
    tokio::time::sleep(Duration::from_secs(holdoff)).await;

    let still_claimed: Vec<InfoHash> = watcher
        .claims
        .claimed()
        .await?
        .intersection(&snapshot)
        .copied()
        .collect();

    if still_claimed.is_empty() {
        info!("No claims survived the holdoff");
        return Ok(());
    }

    watcher.claims.prune(&still_claimed).await?;

    Ok(())
}

async fn read_lines_from_stdin() -> anyhow::Result<Vec<String>> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    let mut hashes = Vec::new();
    while let Some(line) = lines.next_line().await.context("could not read standard input")? {
        let line = line.trim();
        if !line.is_empty() {
            hashes.push(line.to_string());
        }
    }

    Ok(hashes)
}

fn parse_info_hash(raw: &str) -> anyhow::Result<InfoHash> {
    raw.parse::<InfoHash>().with_context(|| format!("`{raw}` is not a valid info-hash"))
}

fn read_announce_file(file: &Path) -> anyhow::Result<Vec<Url>> {
    let content = std::fs::read_to_string(file).with_context(|| format!("could not read {}", file.display()))?;

    let mut announces = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        announces.push(Url::parse(line).with_context(|| format!("`{line}` is not a valid announce URL"))?);
    }

    anyhow::ensure!(!announces.is_empty(), "{} contains no announce URLs", file.display());

    Ok(announces)
}
