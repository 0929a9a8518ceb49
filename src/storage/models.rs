use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 短链接记录
///
/// `expires_at` 为空表示永久链接；`secret` 为空表示该链接被管理员锁定，不可删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortRecord {
    pub id: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secret: String,
}

impl ShortRecord {
    pub fn is_temporary(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn is_locked(&self) -> bool {
        self.secret.is_empty()
    }

    /// 距离过期的剩余秒数（向上取整），永久链接返回 `None`，已过期返回 `Some(0)`
    ///
    /// 未过期的记录至少返回 1，不会比 `is_expired` 更早判定过期
    pub fn remaining_ttl_secs(&self) -> Option<u64> {
        self.expires_at.map(|exp| {
            let ms = (exp - Utc::now()).num_milliseconds();
            if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
        })
    }
}

/// 访问统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// 累计访问次数，永不重置
    pub total: u64,
    /// 最近约一小时内的访问次数
    pub recent: u64,
}

/// 重定向模板（透传持久化，无缓存语义）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectTemplate {
    pub template_url: String,
    pub target_template: String,
    pub created_at: DateTime<Utc>,
}

/// 短码池：预先分配给某个所有者的一组短码（透传持久化，无缓存语义）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPool {
    pub id: String,
    #[serde(default)]
    pub owner_secret: String,
    #[serde(default)]
    pub ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: Option<DateTime<Utc>>, secret: &str) -> ShortRecord {
        ShortRecord {
            id: "abc".to_string(),
            target_url: "https://example.com".to_string(),
            created_at: Utc::now(),
            expires_at,
            secret: secret.to_string(),
        }
    }

    #[test]
    fn test_expiration_flags() {
        let permanent = record(None, "s");
        assert!(!permanent.is_temporary());
        assert!(!permanent.is_expired());
        assert_eq!(permanent.remaining_ttl_secs(), None);

        let expired = record(Some(Utc::now() - Duration::seconds(5)), "s");
        assert!(expired.is_temporary());
        assert!(expired.is_expired());
        assert_eq!(expired.remaining_ttl_secs(), Some(0));

        let live = record(Some(Utc::now() + Duration::hours(1)), "s");
        assert!(!live.is_expired());
        assert!(live.remaining_ttl_secs().unwrap() > 3500);

        // 不足一秒的剩余时间向上取整
        let almost = record(Some(Utc::now() + Duration::milliseconds(800)), "s");
        assert!(!almost.is_expired());
        assert_eq!(almost.remaining_ttl_secs(), Some(1));

        let partial = record(Some(Utc::now() + Duration::milliseconds(2500)), "s");
        assert_eq!(partial.remaining_ttl_secs(), Some(3));
    }

    #[test]
    fn test_locked() {
        assert!(record(None, "").is_locked());
        assert!(!record(None, "secret").is_locked());
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"id":"x","target_url":"https://a.b","created_at":"2024-01-01T00:00:00Z"}"#;
        let rec: ShortRecord = serde_json::from_str(json).unwrap();
        assert!(rec.expires_at.is_none());
        assert!(rec.is_locked());
    }
}
