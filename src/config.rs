use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Cloud service identifiers
    #[serde(default = "default_service_name")]
    pub cloud_service_name: String,
    pub cloud_pod: Option<String>,

    /// JWT secret key
    pub cloud_auth_jwt_secret: Option<String>,

    /// Base URL of the platform app service (user directory)
    pub app_service_url: Option<String>,

    /// Event fan-out scope: "project" routes events to per-project
    /// channels, "global" reproduces the legacy broadcast-to-everyone
    /// behavior.
    #[serde(default = "default_channel_scope")]
    pub channel_scope: String,

    /// Whether a sender receives its own broadcast back
    #[serde(default = "default_echo_broadcasts")]
    pub echo_broadcasts: bool,

    /// Bound of each connection's outbound event queue. A member whose
    /// queue fills up is disconnected rather than buffered further.
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Install the process-wide configuration.
/// Should be called once at startup.
pub fn init_config(config: Config) {
    let _ = CONFIG.set(config);
}

/// Get the process-wide configuration instance.
pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration not initialized. Call init_config() first.")
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    /// Whether events fan out per project rather than to every connection
    pub fn is_project_scoped(&self) -> bool {
        self.channel_scope.to_lowercase() != "global"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            cloud_service_name: default_service_name(),
            cloud_pod: None,
            cloud_auth_jwt_secret: None,
            app_service_url: None,
            channel_scope: default_channel_scope(),
            echo_broadcasts: default_echo_broadcasts(),
            outbound_queue_depth: default_outbound_queue_depth(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "designly-rt".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_channel_scope() -> String {
    "project".to_string()
}

fn default_echo_broadcasts() -> bool {
    true
}

fn default_outbound_queue_depth() -> usize {
    256
}
