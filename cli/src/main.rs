// meshlink-cli: host runtime harness
//
// Drives the dispatcher the way a plugin host would: one JSON call per line
// in, one resolution per call out, with SDK events interleaved as they fire.
// The SDK underneath is the in-memory simulator.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use meshlink_core::capability::{resolver, CapabilityAlias, CapabilityCategory, CapabilityRequest};
use meshlink_core::codec::{identifier, payload, TransmissionMode};
use meshlink_core::logging::init_tracing;
use meshlink_core::{
    AdapterConfig, ApiLevel, Dispatcher, GrantAll, HostEvent, PermissionBackend, SimulatedSdk,
    StaticPermissions,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "meshlink")]
#[command(about = "Mesh SDK adapter harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch JSON-line calls against a simulated SDK
    Run {
        /// Read calls from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Override the configured API level
        #[arg(long)]
        api_level: Option<u32>,
        /// Deny these aliases when permissions are requested
        #[arg(long, value_enum)]
        deny: Vec<AliasArg>,
    },
    /// Show the capability aliases requested at an API level
    Aliases {
        #[arg(long)]
        api_level: u32,
        #[arg(long, value_enum)]
        category: Vec<CategoryArg>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Bluetooth,
    Location,
}

impl From<CategoryArg> for CapabilityCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Bluetooth => CapabilityCategory::Bluetooth,
            CategoryArg::Location => CapabilityCategory::Location,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AliasArg {
    BluetoothNearby,
    BluetoothLegacy,
    Location,
    LocationCoarse,
}

impl From<AliasArg> for CapabilityAlias {
    fn from(arg: AliasArg) -> Self {
        match arg {
            AliasArg::BluetoothNearby => CapabilityAlias::BluetoothNearby,
            AliasArg::BluetoothLegacy => CapabilityAlias::BluetoothLegacy,
            AliasArg::Location => CapabilityAlias::Location,
            AliasArg::LocationCoarse => CapabilityAlias::LocationCoarse,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs, "warn");

    let config_path = config::config_file(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            api_level,
            deny,
        } => {
            let mut adapter_config = config::load(&config_path)?;
            if let Some(level) = api_level {
                adapter_config.api_level = ApiLevel(level);
            }
            cmd_run(adapter_config, input, deny).await
        }
        Commands::Aliases {
            api_level,
            category,
        } => cmd_aliases(ApiLevel(api_level), category),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config_path),
            ConfigAction::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
        },
    }
}

// ============================================================================
// run
// ============================================================================

#[derive(Deserialize)]
struct Call {
    method: String,
    #[serde(default)]
    args: Value,
}

async fn cmd_run(
    adapter_config: AdapterConfig,
    input: Option<PathBuf>,
    deny: Vec<AliasArg>,
) -> Result<()> {
    let sdk = Arc::new(SimulatedSdk::new());
    let permissions: Arc<dyn PermissionBackend> = if deny.is_empty() {
        Arc::new(GrantAll::new(adapter_config.api_level))
    } else {
        let backend = deny
            .into_iter()
            .fold(StaticPermissions::new(adapter_config.api_level), |backend, alias| {
                backend.deny(alias.into())
            });
        Arc::new(backend)
    };
    let (dispatcher, mut events) =
        Dispatcher::with_event_channel(sdk.clone(), permissions, &adapter_config);

    tracing::info!("Harness ready ({})", adapter_config.api_level);

    let reader: Box<dyn tokio::io::AsyncRead + Unpin> = match &input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let call: Call = match serde_json::from_str(line) {
            Ok(call) => call,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), "Malformed call".bold(), e);
                continue;
            }
        };

        let output = match simulate(&sdk, &call) {
            Some(output) => output,
            None => match dispatcher.invoke(&call.method, call.args).await {
                Ok(value) => json!({ "resolve": value }),
                Err(rejection) => json!({ "reject": rejection }),
            },
        };
        println!("{}", output);
        drain_events(&mut events)?;
    }
    Ok(())
}

/// Harness-only calls that poke the simulator instead of the adapter.
fn simulate(sdk: &SimulatedSdk, call: &Call) -> Option<Value> {
    let peer = || identifier::parse_opt(call.args.get("peerID").and_then(Value::as_str));
    match call.method.as_str() {
        "simulateConnect" => Some(match peer() {
            Some(peer_id) => {
                sdk.connect_peer(peer_id);
                json!({ "resolve": null })
            }
            None => json!({ "reject": { "code": "missingUserIdentifier", "message": "peerID is required" } }),
        }),
        "simulateDisconnect" => Some(match peer() {
            Some(peer_id) => {
                sdk.disconnect_peer(peer_id);
                json!({ "resolve": null })
            }
            None => json!({ "reject": { "code": "missingUserIdentifier", "message": "peerID is required" } }),
        }),
        "simulateReceive" => {
            let data = payload::decode_opt(call.args.get("data").and_then(Value::as_str))
                .unwrap_or_default();
            let mode = call.args.get("transmissionMode").and_then(TransmissionMode::decode);
            let message_id = sdk.deliver(data, mode);
            Some(json!({ "resolve": { "messageID": message_id } }))
        }
        _ => None,
    }
}

fn drain_events(events: &mut UnboundedReceiver<HostEvent>) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        println!(
            "{}",
            serde_json::to_string(&event).context("Failed to encode event")?
        );
    }
    Ok(())
}

// ============================================================================
// aliases / config
// ============================================================================

fn cmd_aliases(level: ApiLevel, categories: Vec<CategoryArg>) -> Result<()> {
    let mut request = CapabilityRequest::new(level);
    println!("{} ({})", "Capability request".bold(), request.level());
    println!(
        "  {} {}",
        "default:".dimmed(),
        join(resolver::default_aliases(level))
    );
    for category in categories {
        let category = CapabilityCategory::from(category);
        let added = request.add_category(category);
        println!(
            "  {} {} {}",
            format!("{:?}:", category).to_lowercase().dimmed(),
            join(resolver::aliases_for(level, category)),
            format!("(+{added})").dimmed()
        );
    }
    println!("  {} {}", "request:".green(), join(request.aliases()));
    for alias in request.aliases() {
        println!("    {} {}", alias.as_str().dimmed(), alias.permissions().join(" "));
    }
    Ok(())
}

fn cmd_config_show(path: &std::path::Path) -> Result<()> {
    let adapter_config = config::load(path)?;
    println!("{} {}", "Config:".bold(), path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&adapter_config).context("Failed to encode config")?
    );
    Ok(())
}

fn join(aliases: &[CapabilityAlias]) -> String {
    aliases
        .iter()
        .map(CapabilityAlias::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
