use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelwatchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer allocation failed: {0}")]
    Capacity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<crate::config::ConfigError> for ReelwatchError {
    fn from(err: crate::config::ConfigError) -> Self {
        ReelwatchError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReelwatchError>;
