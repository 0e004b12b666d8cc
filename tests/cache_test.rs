use std::time::Duration;

use bytes::Bytes;
use tempfile::tempdir;

use privchat_media::{DiskMediaCache, MediaCache, MemoryMediaCache};

#[tokio::test]
async fn test_disk_cache_roundtrip() {
    let dir = tempdir().unwrap();
    let cache = DiskMediaCache::open(dir.path().to_str().unwrap())
        .await
        .unwrap();

    assert!(cache.get("images/1").await.is_none());
    cache.put("images/1", Bytes::from_static(b"photo-bytes")).await;

    assert!(cache.contains("images/1").await);
    assert_eq!(cache.get("images/1").await.unwrap().as_ref(), b"photo-bytes");

    cache.remove("images/1").await;
    assert!(!cache.contains("images/1").await);
}

#[tokio::test]
async fn test_disk_cache_copy_if_empty() {
    let dir = tempdir().unwrap();
    let cache = DiskMediaCache::open(dir.path().to_str().unwrap())
        .await
        .unwrap();

    cache.put("images/1", Bytes::from_static(b"source")).await;
    cache.put("images/2", Bytes::from_static(b"existing")).await;

    // 目标已有值，不覆盖
    cache.copy_if_empty("images/1", "images/2").await;
    assert_eq!(cache.get("images/2").await.unwrap().as_ref(), b"existing");

    // 目标为空，复制
    cache.copy_if_empty("images/1", "images/3").await;
    assert_eq!(cache.get("images/3").await.unwrap().as_ref(), b"source");

    // 源不存在，静默跳过
    cache.copy_if_empty("images/404", "images/4").await;
    assert!(!cache.contains("images/4").await);
}

#[tokio::test]
async fn test_disk_cache_survives_reopen() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    {
        let cache = DiskMediaCache::open(&root).await.unwrap();
        cache.put("images/7", Bytes::from_static(b"persisted")).await;
    }

    let cache = DiskMediaCache::open(&root).await.unwrap();
    assert_eq!(cache.get("images/7").await.unwrap().as_ref(), b"persisted");
}

#[tokio::test]
async fn test_disk_cache_rejects_empty_root() {
    assert!(DiskMediaCache::open("  ").await.is_err());
}

#[tokio::test]
async fn test_memory_cache_ttl_expiry() {
    let cache = MemoryMediaCache::new(16, Duration::from_millis(50));
    cache.put("images/1", Bytes::from_static(b"short-lived")).await;
    assert!(cache.get("images/1").await.is_some());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(cache.get("images/1").await.is_none());
}
