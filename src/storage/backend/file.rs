//! 嵌入式单文件存储
//!
//! 整个数据集以 JSON 保存在一个文件里，按桶划分：`urls`、`meta`、`templates`、`pools`。
//! 启动时全部读入内存，每次写入先写临时文件再原子重命名。
//! 同一数据文件只允许一个进程打开：旁边的 `.lock` 文件持有独占锁，进程退出时由系统释放。

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{Result, VaultError};
use crate::storage::{
    LAST_EXPIRATION_CHECK_KEY, LinkPool, RecordStore, RedirectTemplate, ShortRecord,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Buckets {
    #[serde(default)]
    urls: BTreeMap<String, ShortRecord>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
    #[serde(default)]
    templates: BTreeMap<String, RedirectTemplate>,
    #[serde(default)]
    pools: BTreeMap<String, LinkPool>,
}

pub struct FileStore {
    path: PathBuf,
    buckets: Mutex<Buckets>,
    _lock: File,
}

impl FileStore {
    /// 打开（不存在时创建）数据文件
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;

        let buckets = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Buckets::default(),
            Ok(content) => serde_json::from_str::<Buckets>(&content).map_err(|e| {
                VaultError::serialization(format!(
                    "Failed to parse data file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Buckets::default();
                write_atomic(&path, &empty)?;
                info!("Created empty data file: {}", path.display());
                empty
            }
            Err(e) => {
                return Err(VaultError::file_operation(format!(
                    "Failed to read data file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        info!(
            "Loaded {} short URLs from {}",
            buckets.urls.len(),
            path.display()
        );
        Ok(Self {
            path,
            buckets: Mutex::new(buckets),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 在锁内修改并落盘；落盘失败时回滚内存中的修改
    fn update<T>(&self, mutate: impl FnOnce(&mut Buckets) -> T) -> Result<T> {
        let mut buckets = self.buckets.lock();
        let mut next = buckets.clone();
        let out = mutate(&mut next);
        write_atomic(&self.path, &next)?;
        *buckets = next;
        Ok(out)
    }
}

/// 获取数据文件的独占锁；已被其他句柄持有时返回 BackendUnavailable
fn acquire_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    let lock_path = PathBuf::from(lock_path);

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| {
            VaultError::file_operation(format!(
                "Failed to open lock file {}: {}",
                lock_path.display(),
                e
            ))
        })?;

    match file.try_lock() {
        Ok(()) => {
            debug!("Acquired data file lock: {}", lock_path.display());
            Ok(file)
        }
        Err(TryLockError::WouldBlock) => Err(VaultError::backend_unavailable(format!(
            "Data file {} is already in use by another process",
            path.display()
        ))),
        Err(TryLockError::Error(e)) => Err(VaultError::file_operation(format!(
            "Failed to lock {}: {}",
            lock_path.display(),
            e
        ))),
    }
}

fn write_atomic(path: &Path, buckets: &Buckets) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(buckets)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| {
        VaultError::file_operation(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        VaultError::file_operation(format!("Failed to replace {}: {}", path.display(), e))
    })?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn save(&self, record: &ShortRecord) -> Result<()> {
        self.update(|b| b.urls.insert(record.id.clone(), record.clone()))?;
        debug!("Short URL saved: {}", record.id);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ShortRecord>> {
        Ok(self.buckets.lock().urls.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if !self.buckets.lock().urls.contains_key(id) {
            return Ok(());
        }
        self.update(|b| b.urls.remove(id))?;
        debug!("Short URL deleted: {}", id);
        Ok(())
    }

    async fn find_expired(&self) -> Result<Vec<ShortRecord>> {
        let now = Utc::now();
        Ok(self
            .buckets
            .lock()
            .urls
            .values()
            .filter(|r| r.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn last_expiration_check(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self
            .buckets
            .lock()
            .meta
            .get(LAST_EXPIRATION_CHECK_KEY)
            .cloned();

        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        VaultError::serialization(format!(
                            "Invalid {} value '{}': {}",
                            LAST_EXPIRATION_CHECK_KEY, v, e
                        ))
                    })
            })
            .transpose()
    }

    async fn update_last_expiration_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.update(|b| {
            b.meta
                .insert(LAST_EXPIRATION_CHECK_KEY.to_string(), at.to_rfc3339())
        })?;
        Ok(())
    }

    async fn find_templates(&self) -> Result<Vec<RedirectTemplate>> {
        Ok(self.buckets.lock().templates.values().cloned().collect())
    }

    async fn save_template(&self, template: &RedirectTemplate) -> Result<()> {
        self.update(|b| {
            b.templates
                .insert(template.template_url.clone(), template.clone())
        })?;
        Ok(())
    }

    async fn find_pool(&self, id: &str) -> Result<Option<LinkPool>> {
        Ok(self.buckets.lock().pools.get(id).cloned())
    }

    async fn save_pool(&self, pool: &LinkPool) -> Result<()> {
        self.update(|b| b.pools.insert(pool.id.clone(), pool.clone()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        fs::metadata(&self.path).map_err(|e| {
            VaultError::backend_unavailable(format!(
                "Data file {} is not accessible: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}
