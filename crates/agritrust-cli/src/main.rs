//! AgriTrust CLI - Command-line interface for the record ledger

use agritrust_core::{response, LandParcel, Ledger, LedgerConfig, RecordStatus, Response};
use agritrust_registry::RecordSubmission;
use anyhow::{bail, Context};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agritrust")]
#[command(about = "AgriTrust - Tamper-evident agricultural record ledger")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/agritrust.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Submit a record read from a JSON file (or stdin)
    Submit {
        /// JSON file holding the record
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Verify a stored record against its hash
    Verify {
        /// Content identifier of the record
        #[arg(long)]
        cid: String,
    },
    /// Print the canonical form and hash of a record without storing it
    Hash {
        /// JSON file holding the record
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Creation timestamp to hash with
        #[arg(short, long)]
        timestamp: String,
    },
    /// List stored records, newest first
    List {
        /// Only records for this land parcel
        #[arg(long)]
        land_id: Option<String>,
    },
    /// Show or change a record's status label
    Status {
        /// Content identifier of the record
        #[arg(long)]
        cid: String,

        /// New status (pending or verified)
        #[arg(long)]
        set: Option<RecordStatus>,
    },
    /// Verify a record and store the outcome as an attestation
    Attest {
        /// Record to verify
        #[arg(long)]
        target: String,

        /// Content identifier for the attestation record
        #[arg(long)]
        cid: String,

        /// Who performed the check
        #[arg(long)]
        verifier: String,
    },
    /// Manage land parcels
    #[command(subcommand)]
    Land(LandCommands),
}

#[derive(clap::Subcommand)]
enum LandCommands {
    /// Register or replace a land parcel
    Add {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        /// Crop currently planted
        #[arg(long)]
        crop: String,

        #[arg(long)]
        owner: Option<String>,
    },
    /// List land parcels
    List {
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = LedgerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("Using configuration from {}", cli.config.display());

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("AgriTrust v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
    };

    // Hashing alone never opens the database.
    if let Commands::Hash { file, timestamp } = &command {
        let submission = RecordSubmission::from_json(read_body(file.as_deref())?)?;
        let digest = Ledger::compute_record_hash(&submission.record, timestamp);
        print_json(&serde_json::json!({
            "hash": digest.hash.to_string(),
            "canonical": digest.canonical,
        }))?;
        return Ok(());
    }

    let ledger = Ledger::open(config)?;
    let outcome = run(&ledger, command).await;
    ledger.shutdown().await?;

    let response = outcome?;
    print_json(&response.body)?;
    if !response.is_success() || response.body["ok"] == serde_json::json!(false) {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(ledger: &Ledger, command: Commands) -> anyhow::Result<Response> {
    let response = match command {
        Commands::Submit { file } => response::submit(ledger, read_body(file.as_deref())?).await,
        Commands::Verify { cid } => response::verify(ledger, &cid).await,
        Commands::List { land_id } => response::list(ledger, land_id).await,
        Commands::Status { cid, set } => {
            let stored = match set {
                Some(status) => ledger.set_status(&cid, status).await?,
                None => ledger
                    .get(&cid)
                    .await?
                    .with_context(|| format!("no record with cid {}", cid))?,
            };
            Response::new(200, serde_json::json!({ "cid": cid, "status": stored.status }))
        }
        Commands::Attest {
            target,
            cid,
            verifier,
        } => {
            let (verification, receipt) = ledger.attest(&target, &cid, &verifier).await?;
            Response::new(
                201,
                serde_json::json!({
                    "ok": verification.valid,
                    "attestation": receipt,
                }),
            )
        }
        Commands::Land(LandCommands::Add {
            id,
            name,
            crop,
            owner,
        }) => {
            let parcel = LandParcel {
                id,
                name,
                current_crop: crop,
                owner_id: owner,
                last_updated: None,
                last_cid: None,
            };
            ledger.register_land(parcel.clone()).await?;
            Response::new(201, serde_json::to_value(&parcel)?)
        }
        Commands::Land(LandCommands::List { owner }) => {
            let parcels = ledger.land(owner).await?;
            Response::new(200, serde_json::json!({ "parcels": parcels }))
        }
        Commands::Hash { .. } => bail!("hash is handled without opening the ledger"),
    };
    Ok(response)
}

/// Reads a JSON document from `path`, or from stdin when no path is given.
fn read_body(path: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    serde_json::from_str(&text).context("parsing record JSON")
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
