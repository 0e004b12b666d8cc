use std::fmt;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::model::location::ImageWithLocation;

/// 照片 ID（服务端分配，会话内唯一）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 尺寸档位数量
pub const PHOTO_SIZE_COUNT: usize = 3;

/// 照片尺寸档位
///
/// 固定枚举；索引顺序即回退顺序，某档位缺失时向更大档位回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoSize {
    /// 小图（列表/引用预览）
    Small,
    /// 缩略图（消息气泡）
    Thumbnail,
    /// 大图（查看器）
    Large,
}

impl PhotoSize {
    /// 全部档位，按索引顺序
    pub const ALL: [PhotoSize; PHOTO_SIZE_COUNT] =
        [PhotoSize::Small, PhotoSize::Thumbnail, PhotoSize::Large];

    pub const fn index(self) -> usize {
        match self {
            PhotoSize::Small => 0,
            PhotoSize::Thumbnail => 1,
            PhotoSize::Large => 2,
        }
    }

    pub const fn from_index(index: usize) -> Self {
        match index {
            0 => PhotoSize::Small,
            1 => PhotoSize::Thumbnail,
            _ => PhotoSize::Large,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PhotoSize::Small => "small",
            PhotoSize::Thumbnail => "thumbnail",
            PhotoSize::Large => "large",
        }
    }
}

/// 照片级远端路由信息（存储节点 + 访问凭证）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteLocation {
    /// 存储节点 ID
    pub dc_id: u32,
    /// 访问凭证
    pub access_hash: u64,
}

/// 重新向服务端请求照片时使用的输入描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPhoto {
    pub id: PhotoId,
    pub access_hash: u64,
    pub file_reference: Bytes,
}

/// 上传中状态
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    /// 已上传字节数
    pub offset: u64,
    /// 总字节数
    pub size: u64,
    /// 是否在等待所属相册其余项就绪
    pub waiting_for_album: bool,
}

/// 文件引用来源（所在频道与消息），透传给传输层用于刷新 file_reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileOrigin {
    pub channel_id: u64,
    pub message_id: u64,
}

impl FileOrigin {
    pub fn message(channel_id: u64, message_id: u64) -> Self {
        Self { channel_id, message_id }
    }
}

/// 服务端照片描述（收到消息或同步时由会话应用）
#[derive(Debug, Clone, Default)]
pub struct PhotoUpdate {
    pub id: PhotoId,
    /// 发送时间（Unix 秒）
    pub date: i64,
    pub dc_id: u32,
    pub access_hash: u64,
    pub file_reference: Bytes,
    /// 内联缩略图字节（消息内直接携带的模糊小图）
    pub inline_thumbnail: Bytes,
    pub small: ImageWithLocation,
    pub thumbnail: ImageWithLocation,
    pub large: ImageWithLocation,
}
