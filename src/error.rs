use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {url} after {attempts} attempts: {reason}")]
    FetchFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Malformed pricing document at {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    #[error("Region not found: {0}")]
    RegionNotFound(String),

    #[error("Product {api_name} ({platform}) not found in region {region}")]
    ProductNotFound {
        region: String,
        api_name: String,
        platform: String,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, PricingError>;
