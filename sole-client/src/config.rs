//! Store client configuration
//!
//! Every endpoint and credential is injected here; nothing is compiled into
//! the client. Construct explicitly (tests, embedding apps) or read from the
//! environment with [`StoreConfig::from_env`].

/// Configuration for connecting to the hosted storefront services
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Realtime database base URL (e.g. "https://shop.example-db.app")
    pub database_url: String,

    /// Path of the product collection under the database root
    pub products_path: String,

    /// Sign-in endpoint of the auth service
    pub auth_url: String,

    /// API key appended to auth requests
    pub auth_api_key: String,

    /// Image upload endpoint
    pub upload_url: String,

    /// Unsigned upload preset sent with every upload
    pub upload_preset: String,

    /// Request timeout in seconds for writes, auth, and uploads
    ///
    /// The live subscription stream is long-lived and carries no timeout.
    pub timeout: u64,
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the database
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            products_path: "products".to_string(),
            auth_url: String::new(),
            auth_api_key: String::new(),
            upload_url: String::new(),
            upload_preset: String::new(),
            timeout: 30,
        }
    }

    /// Read the configuration from `SOLE_*` environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("SOLE_DATABASE_URL").unwrap_or_default(),
            products_path: std::env::var("SOLE_PRODUCTS_PATH")
                .unwrap_or_else(|_| "products".into()),
            auth_url: std::env::var("SOLE_AUTH_URL").unwrap_or_default(),
            auth_api_key: std::env::var("SOLE_AUTH_API_KEY").unwrap_or_default(),
            upload_url: std::env::var("SOLE_UPLOAD_URL").unwrap_or_default(),
            upload_preset: std::env::var("SOLE_UPLOAD_PRESET").unwrap_or_default(),
            timeout: std::env::var("SOLE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Set the product collection path
    pub fn with_products_path(mut self, path: impl Into<String>) -> Self {
        self.products_path = path.into();
        self
    }

    /// Set the auth endpoint and API key
    pub fn with_auth(mut self, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self.auth_api_key = api_key.into();
        self
    }

    /// Set the upload endpoint and preset
    pub fn with_upload(mut self, url: impl Into<String>, preset: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self.upload_preset = preset.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }
}
