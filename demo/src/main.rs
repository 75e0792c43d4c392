//! Audit ledger bridge demo CLI.
//!
//! Drives the bridge against an in-process ledger network: peers running the
//! audit chaincode, an ordering service, and an event hub.
//!
//! Usage:
//!   cargo run -p demo -- scenario
//!   cargo run -p demo -- enroll --key-store hfc-key-store --user user1
//!   cargo run -p demo -- run --config demo/bridge.toml --events demo/events.jsonl

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auditbridge_chaincode::AuditChaincode;
use auditbridge_config::BridgeConfig;
use auditbridge_contracts::{
    error::{BridgeError, BridgeResult},
    identity::SigningIdentity,
};
use auditbridge_core::{Bridge, BridgeReport, RetryPolicy, SubmitterSettings, TransactionSubmitter};
use auditbridge_events::{source, JsonLinesSource, SchemaDecoder};
use auditbridge_network::{FileKeyStore, LocalNetwork, LocalNetworkConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Audit ledger bridge: store contract audit events on a permissioned ledger.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Audit event to ledger bridge demo",
    long_about = "Consumes audit events, submits each one as a storeAuditEvent transaction,\n\
                  and reports how every submission resolved."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a built-in set of events against a fresh local network.
    Scenario,
    /// Write an enrolled credential for a user into a key store.
    Enroll {
        #[arg(long, default_value = "hfc-key-store")]
        key_store: PathBuf,
        #[arg(long, default_value = "user1")]
        user: String,
        #[arg(long, default_value = "Org1MSP")]
        msp_id: String,
    },
    /// Replay a JSON-lines event file through the bridge.
    Run {
        /// Bridge TOML configuration. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// One JSON audit event per line.
        #[arg(long)]
        events: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for per-transaction detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Scenario => run_scenario().await,
        Command::Enroll {
            key_store,
            user,
            msp_id,
        } => enroll(&key_store, &user, &msp_id),
        Command::Run { config, events } => run_bridge(config.as_deref(), &events).await,
    };

    if let Err(e) = result {
        error!(error = %e, "bridge stopped");
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_scenario() -> BridgeResult<()> {
    let network = LocalNetwork::start(LocalNetworkConfig::default(), Arc::new(AuditChaincode::new()));
    let identity = demo_identity("user1", "Org1MSP");
    let connection = network.connect(identity).await?;

    let submitter = TransactionSubmitter::new(
        Arc::new(connection),
        Arc::new(SchemaDecoder::new()),
        SubmitterSettings::default(),
    );
    let bridge = Bridge::new(Arc::new(submitter), RetryPolicy::fail_fast());

    let (publisher, mut events) = source::channel("clause-events", "clause-hlf", 16);
    let producer = tokio::spawn(async move {
        let payloads = [
            r#"{"contractId":"C1","status":"executed"}"#,
            r#"{"contractId":"C2","status":"signed","amount":1200}"#,
            r#"{"status":"orphaned"}"#,
            r#"{"contractId":"C1","status":"terminated"}"#,
        ];
        for payload in payloads {
            publisher.publish(payload).await?;
        }
        Ok::<(), BridgeError>(())
    });

    let report = bridge.run(&mut events).await;
    match producer.await {
        Ok(published) => published?,
        Err(e) => {
            return Err(BridgeError::Connection {
                reason: format!("event producer failed: {}", e),
            })
        }
    }

    print_summary(&report, &network);
    Ok(())
}

fn enroll(key_store: &Path, user: &str, msp_id: &str) -> BridgeResult<()> {
    std::fs::create_dir_all(key_store).map_err(|e| BridgeError::Config {
        reason: format!("failed to create key store '{}': {}", key_store.display(), e),
    })?;
    let store = FileKeyStore::open(key_store)?;
    store.save_user(&demo_identity(user, msp_id))?;
    info!(user, msp_id, key_store = %key_store.display(), "enrolled user");
    Ok(())
}

async fn run_bridge(config_path: Option<&Path>, events_path: &Path) -> BridgeResult<()> {
    let mut config = match config_path {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;

    let identity = FileKeyStore::open(&config.identity.key_store)?.load_user(&config.identity.user)?;

    let network = LocalNetwork::start(
        LocalNetworkConfig {
            channel: config.network.channel.clone(),
            chaincode_id: config.network.chaincode_id.clone(),
            peers: config.network.peers.clone(),
            orderer: config.network.orderer.clone(),
            event_hub: config.network.event_hub.clone(),
            ..LocalNetworkConfig::default()
        },
        Arc::new(AuditChaincode::new()),
    );
    let connection = network.connect(identity).await?;

    let decoder = match &config.submit.event_schema {
        Some(path) => SchemaDecoder::from_schema_file(path)?,
        None => SchemaDecoder::new(),
    };
    let submitter = TransactionSubmitter::new(
        Arc::new(connection),
        Arc::new(decoder),
        config.submitter_settings(),
    );
    let bridge = Bridge::new(Arc::new(submitter), config.retry_policy());

    let mut events =
        JsonLinesSource::open(events_path, config.source.topic.clone(), config.source.group_id.clone())
            .await?;
    let report = bridge.run(&mut events).await;

    print_summary(&report, &network);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A self-issued credential for local runs.
fn demo_identity(user: &str, msp_id: &str) -> SigningIdentity {
    SigningIdentity {
        name: user.to_string(),
        msp_id: msp_id.to_string(),
        certificate: format!(
            "-----BEGIN CERTIFICATE-----\n{}@{}\n-----END CERTIFICATE-----",
            user, msp_id
        ),
        enrolled: true,
    }
}

fn print_summary(report: &BridgeReport, network: &LocalNetwork) {
    println!();
    println!("Bridge report");
    println!("=============");
    println!("  received        {}", report.received);
    println!("  valid           {}", report.valid);
    println!("  invalid         {}", report.invalid);
    println!("  timed out       {}", report.timeouts);
    println!("  channel errors  {}", report.channel_errors);
    println!("  failed          {}", report.failed);
    println!();
    println!(
        "Ledger height {} (chain {})",
        network.ledger().height(),
        if network.ledger().verify_integrity() { "intact" } else { "BROKEN" }
    );
    for key in network.state().keys() {
        let value = network.state().get_string(&key).unwrap_or_default();
        println!("  {} = {}", key, value);
    }
    println!();
}
