use serde::{Deserialize, Serialize};

use crate::model::photo::{FileOrigin, PhotoId};

/// 媒体领域事件（广播给 UI 层）
///
/// 加载类事件只由大图档位触发：大图加载器决定整张照片对外的
/// 加载/进度/取消语义。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MediaEvent {
    /// 大图加载完成
    PhotoLoadDone {
        photo_id: PhotoId,
    },
    /// 大图加载失败；started 表示失败前是否已接收过数据
    PhotoLoadFailed {
        photo_id: PhotoId,
        started: bool,
    },
    /// 大图加载进度更新
    PhotoLoadProgress {
        photo_id: PhotoId,
    },
    /// 照片布局变化（开始加载大图时触发，消息列表需要重新排版）
    PhotoLayoutChanged {
        photo_id: PhotoId,
    },
    /// 用户请求查看照片
    PhotoOpenRequested {
        photo_id: PhotoId,
        origin: FileOrigin,
    },
    /// 用户请求取消上传（上传取消需要 UI 弹层确认）
    UploadCancelRequested {
        photo_id: PhotoId,
        origin: FileOrigin,
    },
}
