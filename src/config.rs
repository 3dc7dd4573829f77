use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "ollama" or "remote"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    /// Upper bound for a single completion call, in seconds
    pub timeout_secs: u64,
    pub sql_temperature: f32,
    pub summary_temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file holding the sales tables
    #[arg(short, long)]
    pub database: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        // Start with default configuration
        let mut config_builder = Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("web.host", defaults.web.host)?
            .set_default("web.port", defaults.web.port as i64)?
            .set_default("llm.backend", defaults.llm.backend)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default("llm.timeout_secs", defaults.llm.timeout_secs as i64)?
            .set_default("llm.sql_temperature", defaults.llm.sql_temperature as f64)?
            .set_default("llm.summary_temperature", defaults.llm.summary_temperature as f64)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/ad-insight/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // AD_INSIGHT__LLM__MODEL=... style overrides
        config_builder = config_builder.add_source(
            Environment::with_prefix("AD_INSIGHT")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.path = database.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "ecommerce.duckdb".to_string(),
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmConfig {
                backend: "ollama".to_string(),
                model: "sqlcoder-custom".to_string(),
                api_key: None,
                api_url: None,
                timeout_secs: 60,
                sql_temperature: 0.0,
                summary_temperature: 0.5,
            },
        }
    }
}
