//! Application configuration loaded from environment variables.

use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

use crate::model::ModelMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Model ===
    /// Path of the serialized classifier.
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Reload the artifact per request, or load it once at startup.
    #[serde(default)]
    pub model_mode: ModelMode,

    // === Server Configuration ===
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_model_path() -> String {
    "models/random_forest_model.json".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            model_mode: ModelMode::default(),
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_true(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_path.trim().is_empty() {
            return Err("MODEL_PATH must not be empty".to_string());
        }

        if self.port == 0 {
            return Err("PORT must be non-zero".to_string());
        }

        self.socket_addr()?;

        Ok(())
    }

    /// `EnvFilter` directives for the tracing subscriber.
    ///
    /// Verbose mode, from the CLI flag or `VERBOSE`, takes precedence over `RUST_LOG`.
    pub fn log_filter(&self, cli_verbose: bool) -> String {
        if cli_verbose || self.verbose {
            "cardio_risk_service=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| format!("HOST is not an IP address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
