use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod engine;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::store::DataStore;
use crate::engine::pipeline::QueryPipeline;
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // An unreadable store is a configuration error: refuse to start
    let store = DataStore::new(&config.database.path);
    match store.schema().await {
        Ok(schema) => info!(
            "Connected to {} with {} tables",
            config.database.path,
            schema.tables.len()
        ),
        Err(e) => {
            error!("Cannot read database {}: {}", config.database.path, e);
            return Err(e.into());
        }
    }

    info!(
        "Initializing LLM manager with backend: {} (model {})",
        config.llm.backend, config.llm.model
    );
    let llm_manager = LlmManager::new(&config.llm)?;

    let pipeline = QueryPipeline::new(store, llm_manager, &config.llm);
    let app_state = Arc::new(AppState::new(config.clone(), pipeline));

    // Start the web server
    info!("Starting ad-insight server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
