//! 失效消息的通道命名与负载编解码
//!
//! 通道：`{prefix}:updated` / `{prefix}:deleted`
//! 负载：JSON `{"origin": .., "id": .., "record": ..}`；
//! 非 JSON 的裸字符串按记录 ID 处理。

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::storage::ShortRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOp {
    Updated,
    Deleted,
}

impl InvalidationOp {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    pub fn channel(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.suffix())
    }

    pub fn from_channel(prefix: &str, channel: &str) -> Option<Self> {
        let suffix = channel.strip_prefix(prefix)?.strip_prefix(':')?;
        match suffix {
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    /// 发布者进程标识，空字符串表示未知来源
    #[serde(default)]
    pub origin: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ShortRecord>,
}

impl InvalidationMessage {
    pub fn updated(origin: &str, record: &ShortRecord) -> Self {
        Self {
            origin: origin.to_string(),
            id: record.id.clone(),
            record: Some(record.clone()),
        }
    }

    pub fn deleted(origin: &str, id: &str) -> Self {
        Self {
            origin: origin.to_string(),
            id: id.to_string(),
            record: None,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 解析负载，无法得到记录 ID 时返回 `None`
    pub fn decode(payload: &str) -> Option<Self> {
        if let Ok(message) = serde_json::from_str::<Self>(payload) {
            return (!message.id.is_empty()).then_some(message);
        }
        let id = payload.trim();
        (!id.is_empty()).then(|| Self {
            origin: String::new(),
            id: id.to_string(),
            record: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_channel_names() {
        assert_eq!(InvalidationOp::Updated.channel("sv"), "sv:updated");
        assert_eq!(
            InvalidationOp::from_channel("sv", "sv:deleted"),
            Some(InvalidationOp::Deleted)
        );
        assert_eq!(InvalidationOp::from_channel("sv", "other:deleted"), None);
        assert_eq!(InvalidationOp::from_channel("sv", "sv:renamed"), None);
    }

    #[test]
    fn test_updated_payload_carries_record() {
        let record = ShortRecord {
            id: "abc".to_string(),
            target_url: "https://example.com".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            secret: "s".to_string(),
        };
        let payload = InvalidationMessage::updated("node-1", &record)
            .encode()
            .unwrap();
        let decoded = InvalidationMessage::decode(&payload).unwrap();
        assert_eq!(decoded.origin, "node-1");
        assert_eq!(decoded.record, Some(record));
    }

    #[test]
    fn test_bare_payload_is_record_id() {
        let decoded = InvalidationMessage::decode("abc").unwrap();
        assert_eq!(decoded.id, "abc");
        assert!(decoded.origin.is_empty());
        assert!(decoded.record.is_none());

        assert!(InvalidationMessage::decode("  ").is_none());
        assert!(InvalidationMessage::decode(r#"{"origin":"x","id":""}"#).is_none());
    }
}
