use async_trait::async_trait;

use crate::errors::Result;
use crate::storage::ShortRecord;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult {
    /// 缓存命中
    Found(ShortRecord),
    /// 负缓存命中：后端最近确认过不存在
    NotFound,
    /// 没有任何缓存信息，需要回源
    Miss,
}

/// 记录缓存
///
/// 由存储层在读写路径上调用，缓存本身从不访问后端。
#[async_trait]
pub trait RecordCache: Send + Sync {
    async fn get(&self, id: &str) -> CacheResult;

    /// 无条件写入一份新副本
    async fn update_cache(&self, record: &ShortRecord) -> Result<()>;

    /// 移除 `id` 的缓存，返回移除前是否存在
    async fn break_cache(&self, id: &str) -> Result<bool>;

    /// 记录 `id` 在后端不存在
    async fn mark_absent(&self, id: &str) -> Result<()>;

    fn cache_name(&self) -> &'static str;
}
