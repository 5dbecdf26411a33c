//! Application configuration
//!
//! Layered configuration using the `config` crate: built-in defaults, then
//! `config/default.toml`, then `config/{RUN_MODE}.toml`, then `EDUFUND__*`
//! environment variables. `DATABASE_URL` wins over everything for the
//! database URL.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum JSON payload size in bytes
    #[serde(default = "default_payload_limit")]
    pub payload_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_payload_limit() -> usize {
    1024 * 1024
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply embedded migrations at startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,

    /// Token lifetime for staff sessions, in seconds
    #[serde(default = "default_staff_token_secs")]
    pub staff_token_secs: i64,

    /// Token lifetime for e-service sessions, in seconds
    #[serde(default = "default_holder_token_secs")]
    pub holder_token_secs: i64,

    /// Mark session cookies `Secure`
    #[serde(default)]
    pub secure_cookies: bool,

    /// Password for the initial `admin` superadmin, created when no staff user exists
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
}

fn default_staff_token_secs() -> i64 {
    1800
}

fn default_holder_token_secs() -> i64 {
    900
}

/// Allowed browser origins, one list per portal front-end
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o.trim() == origin)
    }
}

/// Invoicing and account-number settings
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Days between invoice issue and due date
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: i64,

    /// Prefix for generated education account numbers
    #[serde(default = "default_account_prefix")]
    pub account_number_prefix: String,

    /// Prefix for generated invoice numbers
    #[serde(default = "default_invoice_prefix")]
    pub invoice_number_prefix: String,
}

fn default_payment_terms() -> i64 {
    30
}

fn default_account_prefix() -> String {
    "EA".to_string()
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            payment_terms_days: default_payment_terms(),
            account_number_prefix: default_account_prefix(),
            invoice_number_prefix: default_invoice_prefix(),
        }
    }
}

/// Batch job settings
#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    /// Run the in-process scheduler
    #[serde(default = "default_batch_enabled")]
    pub enabled: bool,

    /// IANA timezone used to decide "today"
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Age at which education accounts are closed automatically
    #[serde(default = "default_closure_age")]
    pub account_closure_age: u32,

    /// Seconds between automatic account-closure runs
    #[serde(default = "default_closure_interval")]
    pub account_closure_interval_secs: u64,

    /// Seconds between checks for due top-up rules
    #[serde(default = "default_top_up_interval")]
    pub top_up_interval_secs: u64,
}

fn default_batch_enabled() -> bool {
    true
}

fn default_timezone() -> String {
    "Asia/Singapore".to_string()
}

fn default_closure_age() -> u32 {
    30
}

fn default_closure_interval() -> u64 {
    86_400
}

fn default_top_up_interval() -> u64 {
    3_600
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_batch_enabled(),
            timezone: default_timezone(),
            account_closure_age: default_closure_age(),
            account_closure_interval_secs: default_closure_interval(),
            top_up_interval_secs: default_top_up_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config files and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.staff_token_secs", 1800)?
            .set_default("auth.holder_token_secs", 900)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("EDUFUND")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("EDUFUND").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
