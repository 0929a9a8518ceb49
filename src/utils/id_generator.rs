//! 短码与密钥生成
//!
//! 短码只用于避免碰撞，不承担安全职责；删除密钥控制破坏性操作，
//! 必须来自密码学安全的随机源。两者都通过 `rand` 的线程本地生成器获取，
//! 该生成器基于 ChaCha 并定期从操作系统重新播种。

use std::future::Future;

use tracing::{debug, trace, warn};

use crate::config::IdGeneratorConfig;
use crate::errors::Result;

/// 短码字母表：去掉了 0/O、1/l/I 等易混淆字符
pub const SHORT_ID_ALPHABET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 密钥候选字符（过滤器在此基础上筛选）
const TOKEN_BASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 接受所有候选字符
pub fn always_true(_: char) -> bool {
    true
}

/// 只接受不易混淆的字符
pub fn unambiguous(c: char) -> bool {
    !matches!(c, '0' | 'O' | 'o' | '1' | 'l' | 'I')
}

/// 生成随机密钥
///
/// 先用 `filter` 从候选字符中筛出字符集，再对随机字节做拒绝采样：
/// 落在 `256 - 256 % n` 之外的字节直接丢弃，保证每个字符等概率出现。
/// 过滤器拒绝所有字符时返回空串。
pub fn generate_token<F: Fn(char) -> bool>(length: usize, filter: F) -> String {
    let charset: Vec<char> = TOKEN_BASE.chars().filter(|c| filter(*c)).collect();
    if charset.is_empty() {
        warn!("Token charset filter rejected every candidate character");
        return String::new();
    }

    let n = charset.len();
    let limit = 256 - (256 % n);
    let mut token = String::with_capacity(length);
    while token.len() < length {
        let byte = rand::random::<u8>() as usize;
        if byte < limit {
            token.push(charset[byte % n]);
        }
    }
    token
}

/// 短码生成器
///
/// 从固定字母表中抽取定长候选，逐个交给可用性谓词检查，
/// 超过 `max_attempts` 次仍未命中则放弃。
#[derive(Debug, Clone)]
pub struct IdGenerator {
    length: usize,
    max_attempts: u32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_config(&IdGeneratorConfig::default())
    }
}

impl IdGenerator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length: length.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &IdGeneratorConfig) -> Self {
        Self::new(config.length, config.max_attempts)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 抽取一个候选短码（不做可用性检查）
    pub fn candidate(&self) -> String {
        std::iter::repeat_with(|| {
            SHORT_ID_ALPHABET[rand::random_range(0..SHORT_ID_ALPHABET.len())] as char
        })
        .take(self.length)
        .collect()
    }

    /// 返回第一个满足 `is_available` 的候选，重试预算耗尽时返回 `None`
    pub fn generate_short_id<F>(&self, mut is_available: F) -> Option<String>
    where
        F: FnMut(&str) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();
            if is_available(&candidate) {
                trace!("Generated short id '{}' after {} attempt(s)", candidate, attempt);
                return Some(candidate);
            }
            debug!("Short id candidate '{}' is occupied", candidate);
        }
        warn!(
            "Short id generation gave up after {} attempts",
            self.max_attempts
        );
        None
    }

    /// 异步版本，谓词通常是对存储后端的 `is_available` 查询
    ///
    /// 谓词返回的错误会直接向上传播，不会被当作“可用”或“占用”。
    pub async fn generate_short_id_async<F, Fut>(&self, mut is_available: F) -> Result<Option<String>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();
            if is_available(candidate.clone()).await? {
                trace!("Generated short id '{}' after {} attempt(s)", candidate, attempt);
                return Ok(Some(candidate));
            }
            debug!("Short id candidate '{}' is occupied", candidate);
        }
        warn!(
            "Short id generation gave up after {} attempts",
            self.max_attempts
        );
        Ok(None)
    }
}
