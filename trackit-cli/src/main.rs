//! TrackIT Command Line Interface
//!
//! Usage:
//!   trackit register --name <n> --origin <o> --date <d>  - Register a product
//!   trackit append --product-id <id> --stage <s> ...     - Record a journey event
//!   trackit verify <id-or-reference>                     - Verify a product journey
//!   trackit history --address <a>                        - List an address's transactions
//!   trackit cost --product-id <id> --stage <s> ...       - Dry-run cost estimate

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use trackit_engine::{LedgerConfig, RpcLedgerGateway};

mod commands;

#[derive(Parser)]
#[command(name = "trackit")]
#[command(about = "TrackIT supply chain journey ledger CLI")]
#[command(version)]
struct Cli {
    /// Full node RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// Published package that owns the product registry module
    #[arg(long)]
    package: Option<String>,

    /// Shared registry object id
    #[arg(long)]
    registry: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new product and print its verification reference
    Register {
        /// Product name
        #[arg(short, long)]
        name: String,
        /// Origin location
        #[arg(short, long)]
        origin: String,
        /// Manufacturing date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,
        /// Submitter identity
        #[arg(long, default_value = "Supply Chain Participant")]
        submitted_by: String,
        /// Base URI for the verification reference
        #[arg(long, default_value = "https://trackit.example")]
        base_uri: String,
    },

    /// Record a journey event for an existing product
    Append {
        /// Product identifier
        #[arg(short, long)]
        product_id: String,
        /// Supply chain stage label
        #[arg(short, long)]
        stage: String,
        /// Current location
        #[arg(short, long)]
        location: String,
        /// Product condition
        #[arg(short, long, default_value = "Good")]
        condition: String,
        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
        /// Submitter identity
        #[arg(long, default_value = "Supply Chain Participant")]
        submitted_by: String,
    },

    /// Verify a product journey from an identifier or scanned reference
    Verify {
        /// Product identifier or verification reference
        input: String,
    },

    /// List the transactions submitted by one address
    History {
        /// Submitter address
        #[arg(short, long)]
        address: String,
    },

    /// Estimate the resource cost of a journey event without committing it
    Cost {
        /// Product identifier
        #[arg(short, long)]
        product_id: String,
        /// Supply chain stage label
        #[arg(short, long)]
        stage: String,
        /// Current location
        #[arg(short, long)]
        location: String,
        /// Product condition
        #[arg(short, long, default_value = "Good")]
        condition: String,
    },
}

impl Cli {
    fn ledger_config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::default();
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(package) = &self.package {
            config.package_id = package.clone();
        }
        if let Some(registry) = &self.registry {
            config.registry_object_id = registry.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.ledger_config();
    let gateway = Arc::new(RpcLedgerGateway::new(config.clone()));

    let result = match cli.command {
        Commands::Register {
            name,
            origin,
            date,
            description,
            submitted_by,
            base_uri,
        } => {
            commands::handle_register(
                gateway, name, origin, date, description, submitted_by, base_uri,
            )
            .await
        }
        Commands::Append {
            product_id,
            stage,
            location,
            condition,
            notes,
            submitted_by,
        } => {
            commands::handle_append(
                gateway,
                product_id,
                stage,
                location,
                condition,
                notes,
                submitted_by,
            )
            .await
        }
        Commands::Verify { input } => commands::handle_verify(gateway, config, &input).await,
        Commands::History { address } => commands::handle_history(gateway, &address).await,
        Commands::Cost {
            product_id,
            stage,
            location,
            condition,
        } => commands::handle_cost(gateway, product_id, stage, location, condition).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
