//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ClientKind, HubConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    client_count: usize,
    readable_count: usize,
    isolated_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    client_count: config.clients.len(),
                    readable_count: config
                        .clients
                        .iter()
                        .filter(|c| c.kind.is_readable())
                        .count(),
                    isolated_count: config
                        .clients
                        .iter()
                        .filter(|c| c.isolate_failures)
                        .count(),
                    metrics_port: config.observability.metrics_port,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &HubConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.clients.is_empty() {
        warnings.push("No clients configured - every write is dropped".to_string());
    } else if !config.clients.iter().any(|c| c.kind.is_readable()) {
        warnings.push("No readable clients - every read returns the default".to_string());
    }

    let has_recorder = config
        .clients
        .iter()
        .any(|c| c.kind == ClientKind::Recorder);
    match (has_recorder, config.observability.metrics_port) {
        (true, None) => warnings.push(
            "recorder clients configured without observability.metrics_port - metrics are not exported"
                .to_string(),
        ),
        (false, Some(port)) => warnings.push(format!(
            "observability.metrics_port = {port} but no recorder client feeds it"
        )),
        _ => {}
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Clients: {}", summary.client_count);
            println!("  Readable: {}", summary.readable_count);
            println!("  Isolated: {}", summary.isolated_count);
            match summary.metrics_port {
                Some(port) => println!("  Metrics port: {}", port),
                None => println!("  Metrics port: disabled"),
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
