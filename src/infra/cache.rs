use std::time::Duration;
use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use opendal::Operator;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};

/// 媒体缓存接口
///
/// 键由位置派生（见 `CloudLocation::cache_key`），前缀标明媒体类别；
/// 值为编码后的图像字节。缓存引擎本身是外部协作者，这里只约定
/// 最小的键值读写语义。
#[async_trait]
pub trait MediaCache: Send + Sync {
    /// 读取缓存值
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// 写入缓存值
    async fn put(&self, key: &str, value: Bytes);

    /// 删除缓存值
    async fn remove(&self, key: &str);

    /// 目标键为空时从源键复制（合并本地照片数据时使用）
    async fn copy_if_empty(&self, from: &str, to: &str);

    /// 是否存在
    async fn contains(&self, key: &str) -> bool;
}

/// 内存缓存（Moka 本地高速缓存，短 TTL）
pub struct MemoryMediaCache {
    inner: Cache<String, Bytes>,
}

impl MemoryMediaCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner }
    }
}

#[async_trait]
impl MediaCache for MemoryMediaCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) {
        self.inner.insert(key.to_string(), value).await;
    }

    async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    async fn copy_if_empty(&self, from: &str, to: &str) {
        if self.inner.get(to).await.is_some() {
            return;
        }
        if let Some(value) = self.inner.get(from).await {
            self.inner.insert(to.to_string(), value).await;
        }
    }

    async fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

/// 磁盘缓存（OpenDAL Fs 后端）
///
/// 键直接作为相对路径使用，类别前缀即子目录（images/ 等），
/// 与服务端文件存储的目录布局保持一致。
pub struct DiskMediaCache {
    op: Operator,
}

impl DiskMediaCache {
    /// 构建磁盘缓存；root 不存在时自动创建
    pub async fn open(root: &str) -> Result<Self> {
        let root = root.trim();
        if root.is_empty() {
            return Err(MediaError::Configuration(
                "磁盘缓存缺少 root".to_string(),
            ));
        }
        let root_path = std::path::Path::new(root);
        if !root_path.exists() {
            tokio::fs::create_dir_all(root_path).await.map_err(|e| {
                MediaError::Storage(format!("创建缓存目录失败 \"{}\": {}", root, e))
            })?;
        }
        let abs_root = if root_path.is_absolute() {
            root.to_string()
        } else {
            tokio::fs::canonicalize(root_path)
                .await
                .map_err(|e| {
                    MediaError::Storage(format!("无法解析缓存 root \"{}\": {}", root, e))
                })?
                .to_string_lossy()
                .to_string()
        };
        let builder = opendal::services::Fs::default().root(&abs_root);
        let op: Operator = Operator::new(builder)
            .map_err(|e| MediaError::Storage(format!("构建 Fs Operator 失败: {}", e)))?
            .finish();

        op.create_dir("images/")
            .await
            .map_err(|e| MediaError::Storage(format!("创建缓存子目录失败: {}", e)))?;

        debug!("Disk media cache opened at {}", abs_root);
        Ok(Self { op })
    }
}

#[async_trait]
impl MediaCache for DiskMediaCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        match self.op.read(key).await {
            Ok(buf) => Some(buf.to_bytes()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Disk cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: Bytes) {
        if let Err(e) = self.op.write(key, value.to_vec()).await {
            warn!("Disk cache write failed for {}: {}", key, e);
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.op.delete(key).await {
            warn!("Disk cache delete failed for {}: {}", key, e);
        }
    }

    async fn copy_if_empty(&self, from: &str, to: &str) {
        if self.contains(to).await || !self.contains(from).await {
            return;
        }
        if let Err(e) = self.op.copy(from, to).await {
            warn!("Disk cache copy failed {} -> {}: {}", from, to, e);
        }
    }

    async fn contains(&self, key: &str) -> bool {
        self.op.exists(key).await.unwrap_or(false)
    }
}
