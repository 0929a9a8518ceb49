use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    NotFound(String),
    Conflict(String),
    IdSpaceExhausted(String),
    BackendUnavailable(String),
    BusClosed(String),
    DatabaseConfig(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    Unauthorized(String),
    Locked(String),
    CacheWrite(String),
}

impl VaultError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotFound(_) => "E001",
            VaultError::Conflict(_) => "E002",
            VaultError::IdSpaceExhausted(_) => "E003",
            VaultError::BackendUnavailable(_) => "E004",
            VaultError::BusClosed(_) => "E005",
            VaultError::DatabaseConfig(_) => "E006",
            VaultError::DatabaseOperation(_) => "E007",
            VaultError::FileOperation(_) => "E008",
            VaultError::Serialization(_) => "E009",
            VaultError::Validation(_) => "E010",
            VaultError::Unauthorized(_) => "E011",
            VaultError::Locked(_) => "E012",
            VaultError::CacheWrite(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            VaultError::NotFound(_) => "Resource Not Found",
            VaultError::Conflict(_) => "Conflict",
            VaultError::IdSpaceExhausted(_) => "ID Space Exhausted",
            VaultError::BackendUnavailable(_) => "Backend Unavailable",
            VaultError::BusClosed(_) => "Invalidation Bus Closed",
            VaultError::DatabaseConfig(_) => "Database Configuration Error",
            VaultError::DatabaseOperation(_) => "Database Operation Error",
            VaultError::FileOperation(_) => "File Operation Error",
            VaultError::Serialization(_) => "Serialization Error",
            VaultError::Validation(_) => "Validation Error",
            VaultError::Unauthorized(_) => "Unauthorized",
            VaultError::Locked(_) => "Locked",
            VaultError::CacheWrite(_) => "Cache Write Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            VaultError::NotFound(msg)
            | VaultError::Conflict(msg)
            | VaultError::IdSpaceExhausted(msg)
            | VaultError::BackendUnavailable(msg)
            | VaultError::BusClosed(msg)
            | VaultError::DatabaseConfig(msg)
            | VaultError::DatabaseOperation(msg)
            | VaultError::FileOperation(msg)
            | VaultError::Serialization(msg)
            | VaultError::Validation(msg)
            | VaultError::Unauthorized(msg)
            | VaultError::Locked(msg)
            | VaultError::CacheWrite(msg) => msg,
        }
    }

    /// 调用方是否可以稍后重试
    ///
    /// ID 空间耗尽和后端暂时不可用都属于可重试错误，其余错误需要调用方修正输入。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::IdSpaceExhausted(_) | VaultError::BackendUnavailable(_)
        )
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for VaultError {}

// 便捷的构造函数
impl VaultError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        VaultError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        VaultError::Conflict(msg.into())
    }

    pub fn id_space_exhausted<T: Into<String>>(msg: T) -> Self {
        VaultError::IdSpaceExhausted(msg.into())
    }

    pub fn backend_unavailable<T: Into<String>>(msg: T) -> Self {
        VaultError::BackendUnavailable(msg.into())
    }

    pub fn bus_closed<T: Into<String>>(msg: T) -> Self {
        VaultError::BusClosed(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        VaultError::DatabaseConfig(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        VaultError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        VaultError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        VaultError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        VaultError::Validation(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        VaultError::Unauthorized(msg.into())
    }

    pub fn locked<T: Into<String>>(msg: T) -> Self {
        VaultError::Locked(msg.into())
    }

    pub fn cache_write<T: Into<String>>(msg: T) -> Self {
        VaultError::CacheWrite(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for VaultError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                VaultError::BackendUnavailable(err.to_string())
            }
            other => VaultError::DatabaseOperation(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for VaultError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            VaultError::BackendUnavailable(format!("redis: {}", err))
        } else {
            VaultError::DatabaseOperation(format!("redis: {}", err))
        }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VaultError::id_space_exhausted("x").is_retryable());
        assert!(VaultError::backend_unavailable("x").is_retryable());
        assert!(!VaultError::conflict("x").is_retryable());
        assert!(!VaultError::not_found("x").is_retryable());
        assert!(!VaultError::bus_closed("x").is_retryable());
    }

    #[test]
    fn test_format_simple() {
        let err = VaultError::conflict("preferred alias is not available");
        assert_eq!(err.code(), "E002");
        assert_eq!(
            err.to_string(),
            "Conflict: preferred alias is not available"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err: VaultError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, VaultError::Serialization(_)));
    }
}
