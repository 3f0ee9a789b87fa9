use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("API error: {0}")]
    Api(String),

    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status}")]
    Network { status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScopeError>;
