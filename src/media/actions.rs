//! 照片的用户操作（对应消息列表里的点击行为）
//!
//! UI 层只负责把点击翻译成这里的调用；真正的查看器与确认弹层
//! 通过事件总线回到 UI。

use tracing::debug;

use crate::domain::events::MediaEvent;
use crate::media::photo::Photo;
use crate::model::photo::FileOrigin;

/// 查看照片
pub fn open_photo(photo: &Photo, origin: FileOrigin) {
    if photo.is_null() {
        debug!("Ignoring open for photo {} without large location", photo.id);
        return;
    }
    photo.publish(MediaEvent::PhotoOpenRequested {
        photo_id: photo.id,
        origin,
    });
}

/// 保存/下载照片；尚未从服务端获知详情的照片忽略点击
pub fn save_photo(photo: &Photo, origin: FileOrigin) {
    if photo.date() == 0 {
        return;
    }
    photo.load(origin);
}

/// 取消照片的传输：上传中交给 UI 弹层确认，下载中直接取消
pub fn cancel_photo(photo: &Photo, origin: FileOrigin) {
    if photo.date() == 0 {
        return;
    }
    if photo.uploading() {
        photo.publish(MediaEvent::UploadCancelRequested {
            photo_id: photo.id,
            origin,
        });
    } else {
        photo.cancel();
    }
}
