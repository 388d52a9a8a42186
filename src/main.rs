//! Agent Triage - Main Entry Point
//!
//! Development/debug surface for the routing engine: an interactive session
//! loop, a one-shot route command, and configuration inspection. Service
//! deployments embed [`agent_triage::TriageService`] behind their own API
//! layer instead.

use agent_triage::config::TriageConfig;
use agent_triage::engine::EngineOptions;
use agent_triage::index::{HttpSimilarityIndex, HttpSimilarityIndexConfig};
use agent_triage::observability::init_default_logging;
use agent_triage::oracle::{OpenAiOracle, OpenAiOracleConfig};
use agent_triage::registry::AgentRegistry;
use agent_triage::service::TriageService;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

/// Conversational query triage over a catalog of specialized agents
#[derive(Parser)]
#[command(name = "agent-triage")]
#[command(about = "Routes conversational queries to specialized agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive loop: route queries from stdin within one session
    Run {
        /// Session identifier; a fresh one is generated when absent
        #[arg(long)]
        session: Option<String>,
    },
    /// Route a single query and print the decision
    Route {
        /// The query to route
        query: String,
        /// Session identifier; a fresh one is generated when absent
        #[arg(long)]
        session: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run { session } => run_session(config, session).await,
        Commands::Route { query, session } => route_once(config, query, session).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<TriageConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(TriageConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["triage.toml", "config/triage.toml"];
            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(TriageConfig::load_from_file(&path)?);
                }
            }
            Err("no configuration file found; provide one with -c/--config or create triage.toml"
                .into())
        }
    }
}

fn build_service(config: &TriageConfig) -> Result<TriageService, Box<dyn std::error::Error>> {
    let registry = Arc::new(AgentRegistry::load_from_file(&config.catalog.path)?);

    let oracle = OpenAiOracle::new(OpenAiOracleConfig {
        api_key: config.oracle_api_key()?,
        base_url: config.oracle.base_url.clone(),
        model: config.oracle.model.clone(),
        temperature: config.oracle.temperature,
        timeout: Duration::from_secs(config.oracle.timeout_secs),
    })?;

    let index = HttpSimilarityIndex::new(HttpSimilarityIndexConfig {
        base_url: config.index.base_url.clone(),
        collection: config.index.collection.clone(),
        timeout: Duration::from_secs(config.index.timeout_secs),
    })?;

    let options = EngineOptions {
        initial_agent: config.routing.default_agent.clone(),
        search_k: config.routing.search_k,
        distance_threshold: config.routing.distance_threshold,
    };

    Ok(TriageService::new(
        registry,
        Arc::new(index),
        Arc::new(oracle),
        options,
    ))
}

fn session_or_fresh(session: Option<String>) -> String {
    session.unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn run_session(
    config: TriageConfig,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(&config)?;
    let session_id = session_or_fresh(session);
    info!(%session_id, "Interactive triage session started");

    println!("session {session_id} - enter queries, one per line (ctrl-d to exit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        match service.route(&session_id, query).await {
            Ok(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
            Err(e) => eprintln!("route failed: {e}"),
        }
    }

    Ok(())
}

async fn route_once(
    config: TriageConfig,
    query: String,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(&config)?;
    let session_id = session_or_fresh(session);

    let decision = service.route(&session_id, &query).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn handle_config_command(
    config: TriageConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
