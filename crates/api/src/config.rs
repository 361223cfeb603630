//! Runtime configuration, read from the environment at startup.

/// Default cap on request body size: 10 MiB.
pub const UPLOAD_MAX_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the listener binds to.
    pub bind_address: String,
    /// Prefix prepended to every registered route.
    pub base_path: String,
    /// MySQL URL. Absent means in-memory stores (development only).
    pub database_url: Option<String>,
    /// Development mode surfaces underlying error messages to clients.
    pub dev_mode: bool,
    /// Maximum accepted request body size in bytes.
    pub upload_max_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            base_path: String::new(),
            database_url: None,
            dev_mode: false,
            upload_max_size: UPLOAD_MAX_SIZE,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            base_path: std::env::var("API_BASE_PATH").unwrap_or(defaults.base_path),
            database_url: std::env::var("DATABASE_URL").ok(),
            dev_mode: std::env::var("APP_ENV")
                .map(|v| v == "development")
                .unwrap_or(false),
            upload_max_size: std::env::var("UPLOAD_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_max_size),
        }
    }
}
