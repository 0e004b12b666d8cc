use std::sync::{Arc, OnceLock, Weak};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::events::MediaEvent;
use crate::infra::downloader::{FileLoader, LoadFromCloud, LoaderUpdate};
use crate::media::cloud_file::{load_cloud_file, update_cloud_file, LoadOutcome};
use crate::media::photo_media::PhotoMedia;
use crate::media::reply_preview::ReplyPreview;
use crate::model::location::{CloudFile, ImageLocation, ImageView, ImageWithLocation};
use crate::model::photo::{
    FileOrigin, InputPhoto, PhotoId, PhotoSize, RemoteLocation, UploadState, PHOTO_SIZE_COUNT,
};
use crate::session::MediaContext;

/// 展示尺寸的单边上限；超过按比例缩小
const PHOTO_SIDE_LIMIT: u32 = 1280;

/// 照片实体
///
/// 由会话注册表创建并持有。每个尺寸档位各自维护一份云端文件状态；
/// 大图档位的加载器决定整张照片对外的加载/进度/取消语义。
/// 加载、缓存写入等异步工作都在 tokio 任务里进行，实体方法本身同步返回。
pub struct Photo {
    pub id: PhotoId,
    ctx: Arc<MediaContext>,
    weak: Weak<Photo>,
    state: Mutex<PhotoState>,
}

struct PhotoState {
    date: i64,
    images: [CloudFile; PHOTO_SIZE_COUNT],
    inline_thumbnail: Bytes,
    upload: Option<UploadState>,
    media: Weak<PhotoMedia>,
    reply_preview: Option<Arc<ReplyPreview>>,
    remote: RemoteLocation,
    file_reference: Bytes,
}

impl Photo {
    pub(crate) fn new(ctx: Arc<MediaContext>, id: PhotoId) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id,
            ctx,
            weak: weak.clone(),
            state: Mutex::new(PhotoState {
                date: 0,
                images: Default::default(),
                inline_thumbnail: Bytes::new(),
                upload: None,
                media: Weak::new(),
                reply_preview: None,
                remote: RemoteLocation::default(),
                file_reference: Bytes::new(),
            }),
        })
    }

    /// 发送时间（Unix 秒）；0 表示尚未从服务端获知
    pub fn date(&self) -> i64 {
        self.state.lock().date
    }

    pub fn set_date(&self, date: i64) {
        self.state.lock().date = date;
    }

    /// 发送时间；尚未获知或时间戳非法时为 None
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let date = self.date();
        if date == 0 {
            return None;
        }
        DateTime::from_timestamp(date, 0)
    }

    /// 加载大图（用户或自动下载触发的默认入口）
    pub fn load(&self, origin: FileOrigin) {
        self.load_size(PhotoSize::Large, origin, LoadFromCloud::Allow, false);
    }

    /// 加载指定档位
    ///
    /// 请求的档位没有有效位置时，向更大档位回退后加载实际可用的档位。
    pub fn load_size(
        &self,
        size: PhotoSize,
        origin: FileOrigin,
        from_cloud: LoadFromCloud,
        auto_loading: bool,
    ) {
        let outcome;
        let loading_size;
        {
            let mut state = self.state.lock();
            let index = Self::valid_index(&state.images, size);
            // 请求档位无位置时实际加载的档位可能更大
            loading_size = PhotoSize::from_index(index);

            let should = match state.media.upgrade() {
                Some(media) => media.image(size).is_none(),
                None => true,
            };

            let slot: Arc<OnceLock<Weak<FileLoader>>> = Arc::new(OnceLock::new());
            let weak = self.weak.clone();
            let handler_slot = slot.clone();
            let handler = move |update: LoaderUpdate| {
                if let Some(photo) = weak.upgrade() {
                    photo.on_loader_update(loading_size, &handler_slot, update);
                }
            };

            outcome = load_cloud_file(
                &mut state.images[index],
                origin,
                from_cloud,
                auto_loading,
                &self.ctx.downloads,
                move || should,
                handler,
            );
            if outcome == LoadOutcome::Started {
                if let Some(loader) = &state.images[index].loader {
                    let _ = slot.set(Arc::downgrade(loader));
                }
            }
        }

        if outcome == LoadOutcome::FailedInvalid && loading_size == PhotoSize::Large {
            self.publish(MediaEvent::PhotoLoadFailed {
                photo_id: self.id,
                started: false,
            });
        }
        if size == PhotoSize::Large {
            self.publish(MediaEvent::PhotoLayoutChanged { photo_id: self.id });
        }
    }

    /// 下载任务回调；已被替换或移除的加载器的回调被忽略
    fn on_loader_update(
        &self,
        size: PhotoSize,
        slot: &OnceLock<Weak<FileLoader>>,
        update: LoaderUpdate,
    ) {
        let event;
        {
            let mut state = self.state.lock();
            let index = size.index();
            let expected = slot.get().and_then(|weak| weak.upgrade());
            let current_matches = match (&state.images[index].loader, &expected) {
                (Some(current), Some(expected)) => Arc::ptr_eq(current, expected),
                _ => false,
            };
            if !current_matches {
                return;
            }

            match update {
                LoaderUpdate::Progress => {
                    event = Some(MediaEvent::PhotoLoadProgress { photo_id: self.id });
                }
                LoaderUpdate::Done(bytes) => {
                    let file = &mut state.images[index];
                    file.loader = None;
                    file.flags.failed = false;
                    let view = ImageView {
                        bytes,
                        width: file.location.width(),
                        height: file.location.height(),
                    };
                    if let Some(media) = state.media.upgrade() {
                        media.set(size, view);
                    }
                    debug!("Photo {} loaded at {}", self.id, size.as_str());
                    event = Some(MediaEvent::PhotoLoadDone { photo_id: self.id });
                }
                LoaderUpdate::Failed { started, cancelled } => {
                    let file = &mut state.images[index];
                    file.loader = None;
                    if cancelled {
                        file.flags.cancelled = true;
                    } else {
                        file.flags.failed = true;
                    }
                    event = Some(MediaEvent::PhotoLoadFailed {
                        photo_id: self.id,
                        started,
                    });
                }
            }
        }

        if size == PhotoSize::Large {
            if let Some(event) = event {
                self.publish(event);
            }
        }
    }

    /// 大图是否在加载
    pub fn loading(&self) -> bool {
        self.loading_size(PhotoSize::Large)
    }

    pub fn loading_size(&self, size: PhotoSize) -> bool {
        let state = self.state.lock();
        let index = Self::valid_index(&state.images, size);
        state.images[index].loader.is_some()
    }

    /// 回退后的有效档位索引：请求档位或更大的第一个有效位置，兜底到大图
    fn valid_index(images: &[CloudFile; PHOTO_SIZE_COUNT], size: PhotoSize) -> usize {
        (size.index()..PHOTO_SIZE_COUNT)
            .find(|&i| images[i].location.valid())
            .unwrap_or(PhotoSize::Large.index())
    }

    /// 该档位是否有自己的有效位置（不回退）
    pub fn has_exact(&self, size: PhotoSize) -> bool {
        self.state.lock().images[size.index()].location.valid()
    }

    pub fn failed(&self, size: PhotoSize) -> bool {
        let state = self.state.lock();
        let index = Self::valid_index(&state.images, size);
        state.images[index].flags.failed
    }

    /// 回退后的有效位置
    pub fn location(&self, size: PhotoSize) -> ImageLocation {
        let state = self.state.lock();
        let index = Self::valid_index(&state.images, size);
        state.images[index].location.clone()
    }

    pub fn side_limit() -> u32 {
        PHOTO_SIDE_LIMIT
    }

    /// 展示尺寸：超过单边上限时等比缩小，至少 1×1；位置无尺寸时为 None
    pub fn size(&self, size: PhotoSize) -> Option<(u32, u32)> {
        let location = self.location(size);
        scale_to_limit(location.width(), location.height(), PHOTO_SIDE_LIMIT)
    }

    pub fn image_byte_size(&self, size: PhotoSize) -> u64 {
        let state = self.state.lock();
        let index = Self::valid_index(&state.images, size);
        state.images[index].byte_size
    }

    /// 是否应该展示加载进度
    pub fn display_loading(&self) -> bool {
        let state = self.state.lock();
        let large = &state.images[PhotoSize::Large.index()];
        match &large.loader {
            Some(loader) => !loader.loading_local() || !loader.auto_loading(),
            None => match &state.upload {
                Some(upload) => !upload.waiting_for_album,
                None => false,
            },
        }
    }

    /// 取消大图加载
    pub fn cancel(&self) {
        let state = self.state.lock();
        if let Some(loader) = &state.images[PhotoSize::Large.index()].loader {
            loader.cancel();
        }
    }

    /// 总体进度：上传优先，其次大图下载
    pub fn progress(&self) -> f64 {
        let state = self.state.lock();
        if let Some(upload) = &state.upload {
            if upload.size > 0 {
                return (upload.offset as f64 / upload.size as f64).clamp(0.0, 1.0);
            }
            return 0.0;
        }
        match &state.images[PhotoSize::Large.index()].loader {
            Some(loader) => loader.current_progress(),
            None => 0.0,
        }
    }

    /// 大图加载是否被用户取消过
    pub fn cancelled(&self) -> bool {
        self.state.lock().images[PhotoSize::Large.index()].flags.cancelled
    }

    pub fn set_waiting_for_album(&self) {
        if let Some(upload) = &mut self.state.lock().upload {
            upload.waiting_for_album = true;
        }
    }

    pub fn waiting_for_album(&self) -> bool {
        self.state
            .lock()
            .upload
            .as_ref()
            .map(|u| u.waiting_for_album)
            .unwrap_or(false)
    }

    /// 大图已接收的字节数
    pub fn load_offset(&self) -> u64 {
        let state = self.state.lock();
        match &state.images[PhotoSize::Large.index()].loader {
            Some(loader) => loader.current_offset(),
            None => 0,
        }
    }

    pub fn uploading(&self) -> bool {
        self.state.lock().upload.is_some()
    }

    /// 开始上传
    pub fn start_upload(&self, size: u64) {
        let mut state = self.state.lock();
        state.upload = Some(UploadState {
            offset: 0,
            size,
            waiting_for_album: false,
        });
    }

    /// 更新上传进度
    pub fn set_upload_progress(&self, offset: u64) {
        if let Some(upload) = &mut self.state.lock().upload {
            upload.offset = if upload.size > 0 {
                offset.min(upload.size)
            } else {
                offset
            };
        }
    }

    /// 结束上传（完成或取消）
    pub fn finish_upload(&self) {
        self.state.lock().upload = None;
    }

    /// 自动下载设置变化：清除大图的取消状态，允许自动下载重试
    pub fn auto_download_settings_changed(&self) {
        let mut state = self.state.lock();
        let large = &mut state.images[PhotoSize::Large.index()];
        if !large.flags.cancelled {
            return;
        }
        large.loader = None;
        large.flags.cancelled = false;
    }

    /// 引用预览图；不足时触发小图加载
    pub fn get_reply_preview(&self, origin: FileOrigin) -> Option<ImageView> {
        let preview = {
            let mut state = self.state.lock();
            state
                .reply_preview
                .get_or_insert_with(|| Arc::new(ReplyPreview::new()))
                .clone()
        };
        preview.image(self, origin)
    }

    pub fn set_remote_location(&self, dc_id: u32, access_hash: u64, file_reference: Bytes) {
        let mut state = self.state.lock();
        state.file_reference = file_reference;
        if state.remote.dc_id != dc_id || state.remote.access_hash != access_hash {
            state.remote = RemoteLocation { dc_id, access_hash };
        }
    }

    /// 重新向服务端请求照片时使用的输入描述
    pub fn input_photo(&self) -> InputPhoto {
        let state = self.state.lock();
        InputPhoto {
            id: self.id,
            access_hash: state.remote.access_hash,
            file_reference: state.file_reference.clone(),
        }
    }

    pub fn file_reference(&self) -> Bytes {
        self.state.lock().file_reference.clone()
    }

    /// 替换照片与所有档位的文件引用
    pub fn refresh_file_reference(&self, value: &Bytes) {
        let mut state = self.state.lock();
        state.file_reference = value.clone();
        for image in state.images.iter_mut() {
            image.location.refresh_file_reference(value);
        }
    }

    /// 合并本地照片的数据：缓存按键复制，活动视图按档位合并
    ///
    /// 本地发送的照片被服务端确认后会以新 ID 回到会话，旧实体里
    /// 已经解出的数据不应丢掉。
    pub fn collect_local_data(&self, local: &Photo) {
        if std::ptr::eq(self, local) {
            return;
        }

        let local_keys: Vec<Option<String>> = {
            let state = local.state.lock();
            state.images.iter().map(|i| i.location.cache_key()).collect()
        };
        let own_keys: Vec<Option<String>> = {
            let state = self.state.lock();
            state.images.iter().map(|i| i.location.cache_key()).collect()
        };
        for (from, to) in local_keys.into_iter().zip(own_keys) {
            if let (Some(from), Some(to)) = (from, to) {
                let cache = self.ctx.cache.clone();
                tokio::spawn(async move {
                    cache.copy_if_empty(&from, &to).await;
                });
            }
        }

        if let Some(local_media) = local.active_media_view() {
            let media = self.create_media_view();
            media.collect_local_data(&local_media);
            self.ctx.keep_alive(media);
        }
    }

    /// 没有有效的大图位置
    pub fn is_null(&self) -> bool {
        !self.state.lock().images[PhotoSize::Large.index()].location.valid()
    }

    pub fn width(&self) -> u32 {
        self.state.lock().images[PhotoSize::Large.index()].location.width()
    }

    pub fn height(&self) -> u32 {
        self.state.lock().images[PhotoSize::Large.index()].location.height()
    }

    /// 内联缩略图字节（可能为空）
    pub fn inline_thumbnail_bytes(&self) -> Bytes {
        self.state.lock().inline_thumbnail.clone()
    }

    /// 取活动视图；没有则新建（照片只保留弱引用）
    pub fn create_media_view(&self) -> Arc<PhotoMedia> {
        let mut state = self.state.lock();
        if let Some(media) = state.media.upgrade() {
            return media;
        }
        let media = Arc::new(PhotoMedia::new(self.weak.clone()));
        state.media = Arc::downgrade(&media);
        media
    }

    pub fn active_media_view(&self) -> Option<Arc<PhotoMedia>> {
        self.state.lock().media.upgrade()
    }

    /// 应用服务端下发的各档位描述
    ///
    /// 内联缩略图只在尚未持有时采纳；各档位走云端文件更新流程，
    /// 位置变化时在新位置重启加载。
    pub fn update_images(
        &self,
        inline_thumbnail: Bytes,
        small: ImageWithLocation,
        thumbnail: ImageWithLocation,
        large: ImageWithLocation,
    ) {
        let mut restarts: Vec<(PhotoSize, FileOrigin)> = Vec::new();
        {
            let mut state = self.state.lock();
            if !inline_thumbnail.is_empty() && state.inline_thumbnail.is_empty() {
                state.inline_thumbnail = inline_thumbnail;
            }
            let media = state.media.upgrade();
            for (size, data) in [
                (PhotoSize::Small, &small),
                (PhotoSize::Thumbnail, &thumbnail),
                (PhotoSize::Large, &large),
            ] {
                update_cloud_file(
                    &mut state.images[size.index()],
                    data,
                    &self.ctx.cache,
                    |origin| restarts.push((size, origin)),
                    |preloaded| {
                        if let Some(media) = &media {
                            media.set(
                                size,
                                ImageView {
                                    bytes: preloaded,
                                    width: data.location.width(),
                                    height: data.location.height(),
                                },
                            );
                        }
                    },
                );
            }
        }

        for (size, origin) in restarts {
            self.load_size(size, origin, LoadFromCloud::Allow, false);
        }
    }

    pub(crate) fn publish(&self, event: MediaEvent) {
        self.ctx.events.publish(event);
    }
}

impl Drop for Photo {
    fn drop(&mut self) {
        // 照片随会话销毁；进行中的加载一并释放
        let state = self.state.get_mut();
        for image in state.images.iter_mut() {
            if let Some(loader) = image.loader.take() {
                loader.cancel();
            }
        }
    }
}

/// 等比缩放到单边上限内；空尺寸为 None，缩放结果至少 1×1
fn scale_to_limit(width: u32, height: u32, limit: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    if width <= limit && height <= limit {
        return Some((width, height));
    }
    let scale = (limit as f64 / width as f64).min(limit as f64 / height as f64);
    let scaled_width = ((width as f64 * scale).round() as u32).clamp(1, limit);
    let scaled_height = ((height as f64 * scale).round() as u32).clamp(1, limit);
    Some((scaled_width, scaled_height))
}
