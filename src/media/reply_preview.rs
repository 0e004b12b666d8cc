use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;

use crate::infra::downloader::LoadFromCloud;
use crate::media::photo::Photo;
use crate::model::location::ImageView;
use crate::model::photo::{FileOrigin, PhotoSize};

/// 引用预览：引用含照片的消息时展示的小图
///
/// 云端变体就绪前先用内联缩略图占位；一旦某个云端变体可用，
/// 预览升级为终态，不再重建。
pub struct ReplyPreview {
    image: Mutex<Option<ImageView>>,
    good: AtomicBool,
}

impl ReplyPreview {
    pub(crate) fn new() -> Self {
        Self {
            image: Mutex::new(None),
            good: AtomicBool::new(false),
        }
    }

    /// 当前预览图；还没有终态图时触发小图加载
    pub fn image(&self, photo: &Photo, origin: FileOrigin) -> Option<ImageView> {
        if self.good.load(Ordering::Acquire) {
            return self.image.lock().clone();
        }

        let media = photo.create_media_view();
        let loaded = media
            .image(PhotoSize::Small)
            .or_else(|| media.image(PhotoSize::Thumbnail))
            .or_else(|| media.image(PhotoSize::Large));
        if let Some(view) = loaded {
            *self.image.lock() = Some(view.clone());
            self.good.store(true, Ordering::Release);
            return Some(view);
        }

        // 占位：内联缩略图
        {
            let mut image = self.image.lock();
            if image.is_none() {
                *image = media.thumbnail_inline();
            }
        }

        photo.load_size(PhotoSize::Small, origin, LoadFromCloud::Allow, true);
        self.image.lock().clone()
    }

    /// 预览是否已是终态（由云端变体生成）
    pub fn good(&self) -> bool {
        self.good.load(Ordering::Acquire)
    }
}
