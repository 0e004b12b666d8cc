//! Privchat 客户端媒体数据模型
//!
//! 登录会话在内存里维护的照片附件模型：每张照片按尺寸档位维护
//! 云端文件状态，惰性地从传输层按块拉取、写入缓存，并通过事件
//! 总线向 UI 层广播加载进度与用户操作。传输协议、缓存引擎与
//! 图像解码都是外部协作者，只通过窄接口接入。

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod media;
pub mod model;
pub mod session;

pub use config::MediaConfig;
pub use domain::events::MediaEvent;
pub use error::{MediaError, Result};
pub use infra::cache::{DiskMediaCache, MediaCache, MemoryMediaCache};
pub use infra::downloader::{DownloadManager, FileLoader, LoadFromCloud, Transport};
pub use infra::event_bus::MediaEventBus;
pub use media::actions::{cancel_photo, open_photo, save_photo};
pub use media::photo::Photo;
pub use media::photo_media::PhotoMedia;
pub use media::reply_preview::ReplyPreview;
pub use model::location::{
    CloudFile, CloudFileFlags, CloudLocation, ImageLocation, ImageView, ImageWithLocation,
};
pub use model::photo::{
    FileOrigin, InputPhoto, PhotoId, PhotoSize, PhotoUpdate, RemoteLocation, UploadState,
    PHOTO_SIZE_COUNT,
};
pub use session::{MediaContext, MediaSession};
