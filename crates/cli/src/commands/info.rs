//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::HubConfig;
use dispatcher::{BuiltinResolver, TelemetryDispatcher};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Debug, Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
    clients: Vec<ClientInfo>,
}

#[derive(Debug, Serialize)]
struct ClientInfo {
    name: String,
    kind: String,
    readable: bool,
    isolate_failures: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_type: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config, args.resolve)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &HubConfig, resolve: bool) -> Result<ConfigInfo> {
    let resolved_types = if resolve {
        resolve_types(config)?
    } else {
        Vec::new()
    };

    let clients = config
        .clients
        .iter()
        .enumerate()
        .map(|(i, c)| ClientInfo {
            name: c.name.clone(),
            kind: c.kind.to_string(),
            readable: c.kind.is_readable(),
            isolate_failures: c.isolate_failures,
            params: c.params.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            resolved_type: resolved_types.get(i).cloned(),
        })
        .collect();

    Ok(ConfigInfo {
        metrics_port: config.observability.metrics_port,
        clients,
    })
}

/// Resolve every client through a scratch dispatcher, in config order
fn resolve_types(config: &HubConfig) -> Result<Vec<String>> {
    let dispatcher = TelemetryDispatcher::new();
    let resolver = BuiltinResolver::new();

    config
        .clients
        .iter()
        .map(|client_config| {
            dispatcher
                .register_resolved(&resolver, client_config)
                .map(|client| client.type_name().to_string())
                .with_context(|| format!("Failed to resolve client '{}'", client_config.name))
        })
        .collect()
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Telemetry Hub Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    match info.metrics_port {
        Some(port) => println!("📈 Prometheus: 0.0.0.0:{}", port),
        None => println!("📈 Prometheus: disabled"),
    }

    println!("\n📤 Clients ({}) in dispatch order", info.clients.len());
    for (i, client) in info.clients.iter().enumerate() {
        let is_last = i == info.clients.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let mut flags = Vec::new();
        if client.readable {
            flags.push("readable");
        }
        if client.isolate_failures {
            flags.push("isolated");
        }

        println!(
            "   {} {} ({}) [{}]",
            prefix,
            client.name,
            client.kind,
            flags.join(", ")
        );
        for (key, value) in &client.params {
            println!("   {}  ├─ {} = {}", child_prefix, key, value);
        }
        if let Some(ref resolved) = client.resolved_type {
            println!("   {}  └─ type: {}", child_prefix, resolved);
        }
    }

    println!();
}
