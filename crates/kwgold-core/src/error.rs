use thiserror::Error;

#[derive(Error, Debug)]
pub enum KwGoldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),
}

pub type Result<T> = std::result::Result<T, KwGoldError>;
