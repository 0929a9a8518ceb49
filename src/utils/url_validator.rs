//! 目标 URL 与自定义短码验证
//!
//! 只允许 http(s) 目标，并拒绝指向本服务自身等被屏蔽主机的链接，
//! 防止出现重定向回环。

use url::Url;

/// 自定义短码最大长度
pub const MAX_ALIAS_LENGTH: usize = 64;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    InvalidFormat(String),
    MissingHost,
    BlockedHost(String),
    InvalidAlias(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::MissingHost => write!(f, "URL must contain a host"),
            Self::BlockedHost(host) => write!(f, "Host is blocked: {}", host),
            Self::InvalidAlias(msg) => write!(f, "Invalid alias: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for crate::errors::VaultError {
    fn from(err: UrlValidationError) -> Self {
        crate::errors::VaultError::validation(err.to_string())
    }
}

/// 验证目标 URL
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 格式有效且协议为 http / https
/// 3. 包含主机名
/// 4. 主机名（含子域名）不在屏蔽列表中
pub fn validate_target_url(url: &str, blocked_hosts: &[String]) -> Result<Url, UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::InvalidProtocol(format!("{}:", other))),
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlValidationError::MissingHost)?
        .to_lowercase();

    let blocked = blocked_hosts.iter().any(|b| {
        let b = b.trim().to_lowercase();
        !b.is_empty() && (host == b || host.ends_with(&format!(".{}", b)))
    });
    if blocked {
        return Err(UrlValidationError::BlockedHost(host));
    }

    Ok(parsed)
}

/// 验证自定义短码：1~64 个字母、数字、`-` 或 `_`
pub fn validate_alias(alias: &str) -> Result<(), UrlValidationError> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LENGTH {
        return Err(UrlValidationError::InvalidAlias(format!(
            "length must be between 1 and {}",
            MAX_ALIAS_LENGTH
        )));
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(UrlValidationError::InvalidAlias(
            "only letters, digits, '-' and '_' are allowed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked() -> Vec<String> {
        vec!["gme.sh".to_string(), "localhost".to_string()]
    }

    #[test]
    fn test_valid_urls() {
        assert!(validate_target_url("http://example.com", &blocked()).is_ok());
        assert!(validate_target_url("https://example.com/path?query=1", &blocked()).is_ok());
        assert!(validate_target_url("  HTTPS://EXAMPLE.com  ", &blocked()).is_ok());
    }

    #[test]
    fn test_invalid_protocols() {
        assert!(matches!(
            validate_target_url("ftp://example.com", &blocked()),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_target_url("javascript:alert(1)", &blocked()),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(
            validate_target_url("   ", &blocked()),
            Err(UrlValidationError::EmptyUrl)
        );
        assert!(matches!(
            validate_target_url("not a url", &blocked()),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_blocked_hosts_and_subdomains() {
        assert!(matches!(
            validate_target_url("https://gme.sh/abc", &blocked()),
            Err(UrlValidationError::BlockedHost(_))
        ));
        assert!(matches!(
            validate_target_url("https://api.GME.sh/abc", &blocked()),
            Err(UrlValidationError::BlockedHost(_))
        ));
        assert!(matches!(
            validate_target_url("http://localhost:8080", &blocked()),
            Err(UrlValidationError::BlockedHost(_))
        ));
        // 仅后缀相同但不是子域名
        assert!(validate_target_url("https://notgme.sh", &blocked()).is_ok());
    }

    #[test]
    fn test_alias_validation() {
        assert!(validate_alias("abc").is_ok());
        assert!(validate_alias("my-link_2").is_ok());
        assert!(validate_alias("").is_err());
        assert!(validate_alias("with space").is_err());
        assert!(validate_alias("slash/path").is_err());
        assert!(validate_alias(&"a".repeat(65)).is_err());
    }
}
