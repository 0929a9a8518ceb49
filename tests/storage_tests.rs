//! Record store contract tests
//!
//! The same scenarios run against every backend that needs no external
//! service: file, SQLite and in-memory.

use chrono::{Duration, Utc};
use shortvault::config::SqlConfig;
use shortvault::errors::VaultError;
use shortvault::storage::{
    DatabaseStore, FileStore, LinkPool, MemoryStore, RecordStore, RedirectTemplate, ShortRecord,
};
use tempfile::TempDir;

fn create_test_record(id: &str) -> ShortRecord {
    ShortRecord {
        id: id.to_string(),
        target_url: format!("https://{}.example.com/", id),
        created_at: Utc::now(),
        expires_at: None,
        secret: "s3cret".to_string(),
    }
}

fn create_record_with_expiry(id: &str, expires_in: Duration) -> ShortRecord {
    ShortRecord {
        expires_at: Some(Utc::now() + expires_in),
        ..create_test_record(id)
    }
}

async fn sqlite_store(dir: &TempDir) -> DatabaseStore {
    let path = dir.path().join("contract.sqlite");
    let config = SqlConfig {
        database_url: format!("sqlite://{}?mode=rwc", path.display()),
        ..Default::default()
    };
    DatabaseStore::new(&config).await.expect("sqlite store")
}

/// 所有后端共有的读写契约
async fn exercise_basic_contract(store: &dyn RecordStore) {
    // 不存在
    assert!(store.find("nope").await.unwrap().is_none());
    assert!(store.is_available("nope").await.unwrap());
    store.delete("nope").await.unwrap();

    // 保存后可读回
    let record = create_test_record("abc");
    store.save(&record).await.unwrap();
    let found = store.find("abc").await.unwrap().unwrap();
    assert_eq!(found.target_url, record.target_url);
    assert_eq!(found.secret, "s3cret");
    assert!(found.expires_at.is_none());
    assert!(!store.is_available("abc").await.unwrap());

    // 覆盖写
    let mut updated = record.clone();
    updated.target_url = "https://updated.example.com/".to_string();
    store.save(&updated).await.unwrap();
    assert_eq!(
        store.find("abc").await.unwrap().unwrap().target_url,
        "https://updated.example.com/"
    );

    // 删除
    store.delete("abc").await.unwrap();
    assert!(store.find("abc").await.unwrap().is_none());

    // 元数据
    assert!(store.last_expiration_check().await.unwrap().is_none());
    let at = Utc::now();
    store.update_last_expiration_check(at).await.unwrap();
    let stored = store.last_expiration_check().await.unwrap().unwrap();
    assert!((stored - at).num_seconds().abs() <= 1);

    // 模板与短码池透传
    let template = RedirectTemplate {
        template_url: "docs".to_string(),
        target_template: "https://docs.example.com/{path}".to_string(),
        created_at: Utc::now(),
    };
    store.save_template(&template).await.unwrap();
    let templates = store.find_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].target_template, template.target_template);

    let pool = LinkPool {
        id: "team".to_string(),
        owner_secret: "owner".to_string(),
        ids: vec!["a1".to_string(), "b2".to_string()],
        created_at: Utc::now(),
    };
    store.save_pool(&pool).await.unwrap();
    let found_pool = store.find_pool("team").await.unwrap().unwrap();
    assert_eq!(found_pool.ids, pool.ids);
    assert!(store.find_pool("missing").await.unwrap().is_none());

    store.ping().await.unwrap();
}

/// 没有原生 TTL 的后端：过期记录仍可读出，由扫描器清理
async fn exercise_expiration_contract(store: &dyn RecordStore) {
    assert!(!store.supports_native_ttl());

    store
        .save(&create_record_with_expiry("old", Duration::seconds(-10)))
        .await
        .unwrap();
    store
        .save(&create_record_with_expiry("fresh", Duration::hours(1)))
        .await
        .unwrap();
    store.save(&create_test_record("forever")).await.unwrap();

    let expired = store.find_expired().await.unwrap();
    let ids: Vec<_> = expired.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["old"]);

    // 过期记录占用的 ID 可以复用
    assert!(store.find("old").await.unwrap().is_some());
    assert!(store.is_available("old").await.unwrap());
    assert!(!store.is_available("fresh").await.unwrap());
}

#[tokio::test]
async fn test_file_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("links.json")).await.unwrap();
    exercise_basic_contract(&store).await;
    exercise_expiration_contract(&store).await;
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.json");

    {
        let store = FileStore::open(&path).await.unwrap();
        store.save(&create_test_record("keep")).await.unwrap();
        store.update_last_expiration_check(Utc::now()).await.unwrap();
    }

    let reopened = FileStore::open(&path).await.unwrap();
    assert!(reopened.find("keep").await.unwrap().is_some());
    assert!(reopened.last_expiration_check().await.unwrap().is_some());
}

#[tokio::test]
async fn test_file_store_refuses_concurrent_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.json");

    let serving = FileStore::open(&path).await.unwrap();
    serving.save(&create_test_record("a")).await.unwrap();

    // 第二个句柄会用过期快照覆盖第一个句柄的写入，必须被拒绝
    let err = FileStore::open(&path).await.err().unwrap();
    assert!(matches!(err, VaultError::BackendUnavailable(_)));

    serving.save(&create_test_record("b")).await.unwrap();
    drop(serving);

    let reopened = FileStore::open(&path).await.unwrap();
    assert!(reopened.find("a").await.unwrap().is_some());
    assert!(reopened.find("b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_file_store_rejects_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(FileStore::open(&path).await.is_err());
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    assert_eq!(store.kind(), "sqlite");
    exercise_basic_contract(&store).await;
    exercise_expiration_contract(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_reconnect_keeps_data() {
    let dir = TempDir::new().unwrap();
    {
        let store = sqlite_store(&dir).await;
        store.save(&create_test_record("persist")).await.unwrap();
    }
    // 迁移可重复执行
    let store = sqlite_store(&dir).await;
    assert!(store.find("persist").await.unwrap().is_some());
}

#[tokio::test]
async fn test_memory_store_contract() {
    let store = MemoryStore::new();
    assert!(store.supports_native_ttl());
    exercise_basic_contract(&store).await;

    assert!(store.find_expired().await.unwrap().is_empty());
}
