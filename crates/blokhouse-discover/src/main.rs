//! CLI entry point for blokhouse discovery and directory maintenance.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, EnvFilter};

use blokhouse_core::{AssetId, AssetRecord};
use blokhouse_directory::chef::{build_chef_node, export_chef_nodes, export_data_bag};
use blokhouse_directory::inventory::{export_ansible_inventory, find_node};
use blokhouse_directory::puppet::export_puppet_enc;
use blokhouse_directory::{AssetDirectory, AssetStore, FileDirectory};

use blokhouse_discover::config::DiscoverConfig;
use blokhouse_discover::scheduler::DiscoveryScheduler;
use blokhouse_discover::{DiscoveryReconciler, NmapScanner};

#[derive(Parser)]
#[command(name = "blokhouse-discover")]
#[command(about = "Network discovery for the Blokhouse asset directory")]
struct Cli {
    /// Config file prefix (default: blokhouse).
    #[arg(short, long, default_value = "blokhouse")]
    config: String,

    /// Scan target (CIDR or address); repeatable, replaces configured targets.
    #[arg(short, long)]
    target: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single discovery cycle and print its report.
    Once,
    /// Run discovery cycles on the configured interval until Ctrl-C.
    Daemon,
    /// Print every asset as JSON.
    List,
    /// Print an Ansible dynamic inventory.
    Inventory,
    /// Print the Puppet ENC YAML for a node (asset name or IP).
    Puppet { node: String },
    /// Print Chef node objects, one node, or the blokhouse data bag.
    Chef {
        /// Only this node (asset name or IP).
        #[arg(long)]
        node: Option<String>,
        /// Print the data bag instead of nodes.
        #[arg(long, conflicts_with = "node")]
        databag: bool,
    },
    /// Add an asset by hand.
    Add {
        name: String,
        #[arg(long, default_value = "")]
        ip: String,
    },
    /// Delete an asset by id.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut discover_config = load_discover_config(&cli.config)?;
    if !cli.target.is_empty() {
        discover_config.targets = cli.target.clone();
    }
    discover_config.validate()?;

    let store = open_store(&discover_config)?;

    match cli.command {
        Command::List => {
            println!("{}", serde_json::to_string_pretty(&store.list())?);
        }
        Command::Inventory => {
            println!(
                "{}",
                serde_json::to_string_pretty(&export_ansible_inventory(store.as_ref()))?
            );
        }
        Command::Puppet { ref node } => {
            print!("{}", export_puppet_enc(store.as_ref(), node).to_yaml()?);
        }
        Command::Chef {
            node: Some(ref node),
            ..
        } => {
            let records = store.list();
            let Some(record) = find_node(&records, node) else {
                anyhow::bail!("Node {node:?} not found in the asset directory");
            };
            println!("{}", serde_json::to_string_pretty(&build_chef_node(record))?);
        }
        Command::Chef {
            node: None,
            databag: true,
        } => {
            println!(
                "{}",
                serde_json::to_string_pretty(&export_data_bag(store.as_ref()))?
            );
        }
        Command::Chef {
            node: None,
            databag: false,
        } => {
            println!(
                "{}",
                serde_json::to_string_pretty(&export_chef_nodes(store.as_ref()))?
            );
        }
        Command::Add { ref name, ref ip } => {
            let record = AssetRecord::new(name.as_str(), ip.as_str());
            store.create(record.clone())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Delete { ref id } => {
            let id: AssetId = id.parse()?;
            store.delete(id)?;
            println!("{}", serde_json::to_string(&id.to_string())?);
        }
        Command::Once => {
            let reconciler = build_reconciler(&discover_config, store).await?;
            let report = reconciler.run_cycle().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Daemon => {
            let reconciler = Arc::new(build_reconciler(&discover_config, store).await?);
            spawn_event_logger(&reconciler);

            let scheduler = DiscoveryScheduler::new(reconciler, discover_config.interval());
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
    }

    Ok(())
}

async fn build_reconciler(
    config: &DiscoverConfig,
    store: Arc<dyn AssetStore>,
) -> anyhow::Result<DiscoveryReconciler> {
    if config.targets.is_empty() {
        anyhow::bail!("No scan targets: pass --target or set discover.targets in config");
    }

    let scanner = NmapScanner::new(&config.nmap_path, config.parsed_targets()?);
    let version = scanner.verify_installation().await?;
    tracing::info!(nmap_version = %version.lines().next().unwrap_or("").trim(), "Nmap verified");

    Ok(DiscoveryReconciler::new(store, Arc::new(scanner))
        .with_scan_timeout(config.scan_timeout())
        .with_scan_options(config.scan_options())
        .with_event_capacity(config.event_capacity))
}

fn open_store(config: &DiscoverConfig) -> anyhow::Result<Arc<dyn AssetStore>> {
    match config.store_path.as_deref() {
        Some(path) => {
            let store = FileDirectory::open(path)?;
            tracing::info!(path = %store.path().display(), assets = store.len(), "Opened asset store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Using in-memory asset store");
            Ok(Arc::new(AssetDirectory::new()))
        }
    }
}

fn spawn_event_logger(reconciler: &DiscoveryReconciler) {
    let mut events = reconciler.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(event_id = %event.id.0, payload = ?event.payload, "Directory event");
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn load_discover_config(file_prefix: &str) -> anyhow::Result<DiscoverConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("BLOKHOUSE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("discover.targets")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<DiscoverConfig>("discover") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(DiscoverConfig::default()),
        Err(e) => Err(e.into()),
    }
}
