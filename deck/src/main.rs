//! Pipedeck - Entry Point
//!
//! Command-line driver for the deployment status core. Talks to the
//! pipeline orchestrator API and renders status breakdowns, config diffs,
//! history and logs in the terminal.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use pipedeck::app::options::AppOptions;
use pipedeck::app::run::{run, Command};
use pipedeck::logs::{init_logging, LogOptions};
use pipedeck::utils::version_info;

use secrecy::SecretString;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        } else if !cli_args.contains_key("command") {
            // First bare word is the subcommand
            cli_args.insert("command".to_string(), arg.clone());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    if cli_args.contains_key("help") {
        print_usage();
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli_args
            .get("log-level")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default(),
        log_dir: cli_args.get("log-dir").map(PathBuf::from),
        json_format: cli_args.contains_key("log-json"),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => Some(guard),
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Build the options
    let mut options = AppOptions::default();
    if let Some(base_url) = cli_args.get("backend") {
        options.backend_base_url = base_url.clone();
    }
    if let Ok(token) = env::var("PIPEDECK_API_TOKEN") {
        if !token.is_empty() {
            options.api_token = Some(SecretString::from(token));
        }
    }

    // Parse the command
    let command = match Command::from_args(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    info!("Running pipedeck {} against {}", version.version, options.backend_base_url);
    let result = run(options, command, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: pipedeck <command> [--key=value ...]");
    println!();
    println!("Commands:");
    println!("  status   --app=ID --env=ID [--trigger=ID] [--app-type=argo_cd|helm] [--virtual-env] [--watch]");
    println!("  history  --app=ID --env=ID --pipeline=ID [--offset=N] [--size=N]");
    println!("  diff     --app=ID --env=ID --app-name=NAME --env-name=NAME --pipeline=ID --workflow=ID");
    println!("           [--base-workflow=ID] [--resolve-variables]");
    println!("  logs     --pipeline=ID --workflow=ID");
    println!("  abort    --pipeline=ID --workflow=ID");
    println!("  sync     --app=ID --env=ID");
    println!("  bulk     --targets=APP:ENV[,APP:ENV...]");
    println!();
    println!("Options:");
    println!("  --backend=URL      Orchestrator API base URL");
    println!("  --log-level=LEVEL  trace, debug, info, warn or error");
    println!("  --log-dir=PATH     Also write logs to daily files under PATH");
    println!("  --log-json         JSON log format");
    println!("  --version          Print version info and exit");
    println!();
    println!("Environment:");
    println!("  PIPEDECK_API_TOKEN  Bearer token for the orchestrator API");
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
