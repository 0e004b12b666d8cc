use std::sync::{Arc, Weak};
use parking_lot::Mutex;

use crate::media::photo::Photo;
use crate::model::location::ImageView;
use crate::model::photo::{PhotoSize, PHOTO_SIZE_COUNT};

/// 照片的活动内存视图
///
/// 展示组件持有 Arc；照片本体只保留弱引用，视图随最后一个使用者
/// 释放，释放后照片仍可按需重建。
pub struct PhotoMedia {
    photo: Weak<Photo>,
    images: Mutex<[Option<ImageView>; PHOTO_SIZE_COUNT]>,
    inline_thumbnail: Mutex<Option<ImageView>>,
}

impl PhotoMedia {
    pub(crate) fn new(photo: Weak<Photo>) -> Self {
        Self {
            photo,
            images: Mutex::new(Default::default()),
            inline_thumbnail: Mutex::new(None),
        }
    }

    /// 所属照片；照片已随会话销毁时为 None
    pub fn owner(&self) -> Option<Arc<Photo>> {
        self.photo.upgrade()
    }

    /// 该档位已加载的图像（精确档位，不回退）
    pub fn image(&self, size: PhotoSize) -> Option<ImageView> {
        self.images.lock()[size.index()].clone()
    }

    pub(crate) fn set(&self, size: PhotoSize, view: ImageView) {
        self.images.lock()[size.index()] = Some(view);
    }

    /// 内联缩略图（消息内直接携带的模糊小图），首次访问时从照片取字节
    pub fn thumbnail_inline(&self) -> Option<ImageView> {
        let mut slot = self.inline_thumbnail.lock();
        if slot.is_none() {
            if let Some(photo) = self.photo.upgrade() {
                let bytes = photo.inline_thumbnail_bytes();
                if !bytes.is_empty() {
                    *slot = Some(ImageView {
                        bytes,
                        width: 0,
                        height: 0,
                    });
                }
            }
        }
        slot.clone()
    }

    /// 当前可用的最佳图像：从大到小，内联缩略图兜底
    pub fn any_image(&self) -> Option<ImageView> {
        {
            let images = self.images.lock();
            for size in [PhotoSize::Large, PhotoSize::Thumbnail, PhotoSize::Small] {
                if let Some(view) = &images[size.index()] {
                    return Some(view.clone());
                }
            }
        }
        self.thumbnail_inline()
    }

    /// 从另一个视图合并已加载的数据，不覆盖已有档位
    pub(crate) fn collect_local_data(&self, other: &PhotoMedia) {
        // 先取对方的快照再锁自己，两把锁不同时持有
        let other_images = other.images.lock().clone();
        let other_inline = other.inline_thumbnail.lock().clone();

        {
            let mut images = self.images.lock();
            for index in 0..PHOTO_SIZE_COUNT {
                if images[index].is_none() {
                    images[index] = other_images[index].clone();
                }
            }
        }
        let mut inline = self.inline_thumbnail.lock();
        if inline.is_none() {
            *inline = other_inline;
        }
    }
}
