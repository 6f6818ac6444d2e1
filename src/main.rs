use anyhow::Context;
use catona::api::cli::{Cli, Command, LogFormat, build_funnel_inputs, build_projection_inputs};
use catona::api::config::ServerConfig;
use catona::api::run_http_server;
use catona::core::{DEFAULT_MODEL, calculate_tier_metrics, export_audit, run_projection};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve(args) => {
            let config = ServerConfig::try_from(args).context("invalid server configuration")?;
            run_http_server(config).await
        }
        Command::Project(args) => {
            let inputs = build_projection_inputs(args).map_err(anyhow::Error::msg)?;
            let result = run_projection(&DEFAULT_MODEL, &inputs);
            if !result.flags.is_empty() {
                tracing::warn!(flags = ?result.flags, "projection inputs outside benchmark ranges");
            }
            print_json(&result)
        }
        Command::Tiers(args) => {
            let inputs = build_funnel_inputs(args).map_err(anyhow::Error::msg)?;
            print_json(&calculate_tier_metrics(
                &DEFAULT_MODEL,
                inputs.base_cvr,
                inputs.total_budget,
                inputs.ctr,
            ))
        }
        Command::Audit(args) => {
            let inputs = build_funnel_inputs(args).map_err(anyhow::Error::msg)?;
            print_json(&export_audit(
                &DEFAULT_MODEL,
                inputs.base_cvr,
                inputs.total_budget,
                inputs.ctr,
            ))
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catona=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
