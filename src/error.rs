use std::error::Error as StdError;
use std::fmt;
use serde::{Deserialize, Serialize};

/// 媒体层错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MediaError {
    /// 内部错误
    Internal(String),
    /// 验证错误
    Validation(String),
    /// 资源未找到
    NotFound(String),
    /// 缓存错误
    Cache(String),
    /// 网络错误
    Network(String),
    /// 存储错误
    Storage(String),
    /// 配置错误
    Configuration(String),
    /// 序列化错误
    Serialization(String),
    /// 超时错误
    Timeout(String),
    /// 加载已取消
    Cancelled,
    /// 不支持的操作
    Unsupported(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Internal(msg) => write!(f, "Internal error: {}", msg),
            MediaError::Validation(msg) => write!(f, "Validation error: {}", msg),
            MediaError::NotFound(msg) => write!(f, "Not found: {}", msg),
            MediaError::Cache(msg) => write!(f, "Cache error: {}", msg),
            MediaError::Network(msg) => write!(f, "Network error: {}", msg),
            MediaError::Storage(msg) => write!(f, "Storage error: {}", msg),
            MediaError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            MediaError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            MediaError::Timeout(msg) => write!(f, "Timeout error: {}", msg),
            MediaError::Cancelled => write!(f, "Load cancelled"),
            MediaError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl StdError for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::Serialization(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for MediaError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        MediaError::Timeout(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, MediaError>;
