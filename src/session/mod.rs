//! 媒体会话：照片注册表与会话级共享设施

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::infra::cache::{MediaCache, MemoryMediaCache};
use crate::infra::downloader::{DownloadManager, LoadFromCloud, Transport};
use crate::infra::event_bus::MediaEventBus;
use crate::media::photo::Photo;
use crate::media::photo_media::PhotoMedia;
use crate::model::photo::{FileOrigin, PhotoId, PhotoSize, PhotoUpdate};

/// 合并后的视图在会话里的保活时长
const KEEP_ALIVE_GRACE: Duration = Duration::from_secs(30);

/// 会话级共享的媒体基础设施，照片实体各持有一份 Arc
pub struct MediaContext {
    pub cache: Arc<dyn MediaCache>,
    pub downloads: DownloadManager,
    pub events: MediaEventBus,
    pub config: MediaConfig,
    keep_alive: Mutex<Vec<(Instant, Arc<PhotoMedia>)>>,
}

impl MediaContext {
    /// 暂存一个视图，让合并来的数据在没有展示组件持有时也活过一段时间
    pub(crate) fn keep_alive(&self, media: Arc<PhotoMedia>) {
        let mut entries = self.keep_alive.lock();
        entries.retain(|(at, _)| at.elapsed() < KEEP_ALIVE_GRACE);
        entries.push((Instant::now(), media));
    }

    /// 清理过期的保活视图；宿主可以周期性调用
    pub fn prune_keep_alive(&self) {
        self.keep_alive
            .lock()
            .retain(|(at, _)| at.elapsed() < KEEP_ALIVE_GRACE);
    }

    #[cfg(test)]
    pub(crate) fn keep_alive_count(&self) -> usize {
        self.keep_alive.lock().len()
    }
}

/// 媒体会话：照片实体的所有者（"owner"）
///
/// 随登录会话创建；销毁时照片实体一并析构，进行中的加载被释放。
pub struct MediaSession {
    ctx: Arc<MediaContext>,
    photos: DashMap<PhotoId, Arc<Photo>>,
}

impl MediaSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn MediaCache>,
        config: MediaConfig,
    ) -> Self {
        let downloads = DownloadManager::new(transport, cache.clone(), config.loader.clone());
        let ctx = Arc::new(MediaContext {
            cache,
            downloads,
            events: MediaEventBus::new(),
            config,
            keep_alive: Mutex::new(Vec::new()),
        });
        info!("Media session created");
        Self {
            ctx,
            photos: DashMap::new(),
        }
    }

    /// 使用配置默认的内存缓存构建会话
    pub fn with_default_cache(transport: Arc<dyn Transport>, config: MediaConfig) -> Self {
        let cache = Arc::new(MemoryMediaCache::new(
            config.cache.max_entries,
            Duration::from_secs(config.cache.ttl_secs),
        ));
        Self::new(transport, cache, config)
    }

    pub fn context(&self) -> &Arc<MediaContext> {
        &self.ctx
    }

    pub fn events(&self) -> &MediaEventBus {
        &self.ctx.events
    }

    pub fn config(&self) -> &MediaConfig {
        &self.ctx.config
    }

    /// 取或建照片实体
    pub fn photo(&self, id: PhotoId) -> Arc<Photo> {
        self.photos
            .entry(id)
            .or_insert_with(|| Photo::new(self.ctx.clone(), id))
            .clone()
    }

    /// 只查不建
    pub fn existing_photo(&self, id: PhotoId) -> Option<Arc<Photo>> {
        self.photos.get(&id).map(|photo| photo.clone())
    }

    /// 应用服务端照片描述；会话由此获知新照片
    pub fn process_photo(&self, update: PhotoUpdate) -> Arc<Photo> {
        let photo = self.photo(update.id);
        if update.date != 0 {
            photo.set_date(update.date);
        }
        photo.set_remote_location(update.dc_id, update.access_hash, update.file_reference.clone());
        photo.update_images(
            update.inline_thumbnail,
            update.small,
            update.thumbnail,
            update.large,
        );
        debug!("Processed photo {}", update.id);
        photo
    }

    /// 按自动下载设置预取大图
    pub fn maybe_auto_load(&self, photo: &Photo, origin: FileOrigin) {
        let auto = &self.ctx.config.auto_download;
        if !auto.photos {
            return;
        }
        if photo.image_byte_size(PhotoSize::Large) > auto.max_photo_bytes {
            return;
        }
        photo.load_size(PhotoSize::Large, origin, LoadFromCloud::Allow, true);
    }

    /// 自动下载设置变化：允许之前被取消的自动下载重试
    pub fn auto_download_settings_changed(&self) {
        for entry in self.photos.iter() {
            entry.value().auto_download_settings_changed();
        }
    }

    pub fn photo_count(&self) -> usize {
        self.photos.len()
    }

    /// 注销时清空注册表；照片析构会释放进行中的加载
    pub fn clear(&self) {
        info!("Media session cleared, dropping {} photos", self.photos.len());
        self.photos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use crate::error::Result;
    use crate::model::location::CloudLocation;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn fetch_chunk(
            &self,
            _location: &CloudLocation,
            _origin: FileOrigin,
            _offset: u64,
            _limit: u64,
        ) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn session() -> MediaSession {
        MediaSession::with_default_cache(Arc::new(NullTransport), MediaConfig::default())
    }

    #[tokio::test]
    async fn test_photo_registry_get_or_create() {
        let session = session();
        let first = session.photo(PhotoId(1));
        let again = session.photo(PhotoId(1));
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(session.photo_count(), 1);

        assert!(session.existing_photo(PhotoId(2)).is_none());
        session.photo(PhotoId(2));
        assert!(session.existing_photo(PhotoId(2)).is_some());
    }

    #[tokio::test]
    async fn test_clear_drops_photos() {
        let session = session();
        session.photo(PhotoId(1));
        session.photo(PhotoId(2));
        session.clear();
        assert_eq!(session.photo_count(), 0);
    }

    #[tokio::test]
    async fn test_keep_alive_prune() {
        let session = session();
        let photo = session.photo(PhotoId(1));
        let media = photo.create_media_view();
        session.context().keep_alive(media);
        assert_eq!(session.context().keep_alive_count(), 1);
        // 宽限期内不清理
        session.context().prune_keep_alive();
        assert_eq!(session.context().keep_alive_count(), 1);
    }
}
