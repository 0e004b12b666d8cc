use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::infra::cache::MediaCache;
use crate::model::location::CloudLocation;
use crate::model::photo::FileOrigin;

/// 传输层接口：协议客户端暴露给媒体层的最小下载能力
#[async_trait]
pub trait Transport: Send + Sync {
    /// 拉取一个数据块；返回空块表示文件结束
    async fn fetch_chunk(
        &self,
        location: &CloudLocation,
        origin: FileOrigin,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes>;
}

/// 是否允许从云端加载
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFromCloud {
    /// 本地缓存未命中时继续从云端拉取
    Allow,
    /// 只查本地缓存；未命中则挂起等待许可
    LocalOnly,
}

/// 加载器状态变化，由下载任务回调给照片层
#[derive(Debug)]
pub(crate) enum LoaderUpdate {
    /// 收到新数据块
    Progress,
    /// 加载完成，携带完整字节
    Done(Bytes),
    /// 加载终止；started 表示终止前是否已接收过数据
    Failed { started: bool, cancelled: bool },
}

/// 单个尺寸档位的活动下载任务
///
/// 先查本地缓存（loading_local 阶段），未命中且获得云端许可后
/// 按块从传输层拉取；取消是协作式的，在块间生效。
pub struct FileLoader {
    location: CloudLocation,
    origin: FileOrigin,
    auto_loading: bool,
    total: AtomicU64,
    offset: AtomicU64,
    loading_local: AtomicBool,
    cloud_permitted: AtomicBool,
    cancelled: AtomicBool,
    notify: Notify,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FileLoader {
    /// 是否由自动下载发起（而非用户点击）
    pub fn auto_loading(&self) -> bool {
        self.auto_loading
    }

    /// 是否仍在本地缓存探测阶段
    pub fn loading_local(&self) -> bool {
        self.loading_local.load(Ordering::SeqCst)
    }

    /// 已接收字节数
    pub fn current_offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    /// 总字节数；0 表示未知
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// 当前进度 [0, 1]；总大小未知时为 0
    pub fn current_progress(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.current_offset() as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// 允许本地优先的加载继续访问云端
    pub fn permit_cloud(&self) {
        if !self.cloud_permitted.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// 取消加载（协作式，在块间生效）
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn origin(&self) -> FileOrigin {
        self.origin
    }
}

impl fmt::Debug for FileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLoader")
            .field("file_id", &self.location.file_id)
            .field("offset", &self.current_offset())
            .field("total", &self.total())
            .field("auto_loading", &self.auto_loading)
            .finish()
    }
}

impl Drop for FileLoader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

/// 下载管理器：为每个尺寸档位创建并驱动 FileLoader
pub struct DownloadManager {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn MediaCache>,
    config: LoaderConfig,
}

impl DownloadManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn MediaCache>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }

    /// 创建并启动一个加载任务；必须在 tokio 运行时内调用
    pub(crate) fn start(
        &self,
        location: CloudLocation,
        origin: FileOrigin,
        expected_size: u64,
        from_cloud: LoadFromCloud,
        auto_loading: bool,
        on_update: impl Fn(LoaderUpdate) + Send + Sync + 'static,
    ) -> Arc<FileLoader> {
        let loader = Arc::new(FileLoader {
            location,
            origin,
            auto_loading,
            total: AtomicU64::new(expected_size),
            offset: AtomicU64::new(0),
            loading_local: AtomicBool::new(true),
            cloud_permitted: AtomicBool::new(from_cloud == LoadFromCloud::Allow),
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
            handle: Mutex::new(None),
        });

        let task_loader = loader.clone();
        let transport = self.transport.clone();
        let cache = self.cache.clone();
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            run_loader(task_loader, transport, cache, config, on_update).await;
        });
        *loader.handle.lock() = Some(handle);

        loader
    }
}

async fn run_loader(
    loader: Arc<FileLoader>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn MediaCache>,
    config: LoaderConfig,
    on_update: impl Fn(LoaderUpdate),
) {
    let key = loader.location.cache_key();

    // 本地阶段：缓存命中直接完成
    if let Some(bytes) = cache.get(&key).await {
        loader.loading_local.store(false, Ordering::SeqCst);
        loader.offset.store(bytes.len() as u64, Ordering::SeqCst);
        loader.total.store(bytes.len() as u64, Ordering::SeqCst);
        debug!("Photo file {} served from cache", loader.location.file_id);
        on_update(LoaderUpdate::Done(bytes));
        return;
    }
    loader.loading_local.store(false, Ordering::SeqCst);

    // 等待云端许可（LocalOnly 且缓存未命中时挂起，直到 permit 或 cancel）
    loop {
        let notified = loader.notify.notified();
        tokio::pin!(notified);
        // 先注册唤醒，再检查标志，避免丢失通知
        notified.as_mut().enable();
        if loader.is_cancelled() {
            on_update(LoaderUpdate::Failed { started: false, cancelled: true });
            return;
        }
        if loader.cloud_permitted.load(Ordering::SeqCst) {
            break;
        }
        notified.await;
    }

    // 云端阶段：按块拉取
    let expected = loader.total();
    let mut buf = BytesMut::new();
    let mut retries = 0u32;
    loop {
        if loader.is_cancelled() {
            on_update(LoaderUpdate::Failed {
                started: !buf.is_empty(),
                cancelled: true,
            });
            return;
        }

        let offset = buf.len() as u64;
        let fetched = tokio::select! {
            result = transport.fetch_chunk(&loader.location, loader.origin, offset, config.chunk_size) => Some(result),
            _ = loader.notify.notified() => None,
        };
        let result = match fetched {
            Some(result) => result,
            // 被取消或许可变化打断，回到循环头重新检查
            None => continue,
        };

        match result {
            Ok(chunk) => {
                retries = 0;
                if !chunk.is_empty() {
                    buf.extend_from_slice(&chunk);
                    loader.offset.store(buf.len() as u64, Ordering::SeqCst);
                }
                let finished = chunk.is_empty()
                    || (expected > 0 && buf.len() as u64 >= expected);
                if finished {
                    let bytes = buf.freeze();
                    loader.total.store(bytes.len() as u64, Ordering::SeqCst);
                    loader.offset.store(bytes.len() as u64, Ordering::SeqCst);
                    cache.put(&key, bytes.clone()).await;
                    debug!(
                        "Photo file {} downloaded, {} bytes",
                        loader.location.file_id,
                        bytes.len()
                    );
                    on_update(LoaderUpdate::Done(bytes));
                    return;
                }
                on_update(LoaderUpdate::Progress);
            }
            Err(e) => {
                retries += 1;
                if retries > config.max_retries {
                    warn!(
                        "Photo file {} download failed after {} retries: {}",
                        loader.location.file_id, config.max_retries, e
                    );
                    on_update(LoaderUpdate::Failed {
                        started: !buf.is_empty(),
                        cancelled: false,
                    });
                    return;
                }
                let backoff = config.retry_backoff_ms << (retries - 1).min(4);
                let jitter = fastrand::u64(0..config.retry_backoff_ms.max(1));
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
        }
    }
}
