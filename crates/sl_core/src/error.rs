//! 全局错误处理机制

use thiserror::Error;

/// SignLoom 统一错误类型
#[derive(Error, Debug)]
pub enum SignLoomError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Landmark error: {0}")]
    Landmarks(String),

    #[error("Landmark extractor error: {0}")]
    Extractor(String),

    #[error("Sign detector error: {0}")]
    Detector(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 统一 Result 类型别名
pub type Result<T> = std::result::Result<T, SignLoomError>;
