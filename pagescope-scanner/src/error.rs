use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to fetch URL: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status code: {0}")]
    Status(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not a navigable link: {0:?}")]
    NotNavigable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
