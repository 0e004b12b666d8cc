use std::sync::Arc;
use bytes::Bytes;

use crate::infra::downloader::FileLoader;

/// 某一尺寸档位的远端文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLocation {
    /// 远端文件 ID
    pub file_id: u64,
    /// 文件引用（服务端签发，过期后需刷新）
    pub file_reference: Bytes,
}

impl CloudLocation {
    pub fn new(file_id: u64, file_reference: Bytes) -> Self {
        Self { file_id, file_reference }
    }

    /// 缓存键；同一远端文件的所有副本共享，前缀即磁盘缓存子目录
    pub fn cache_key(&self) -> String {
        format!("images/{}", self.file_id)
    }
}

/// 位置描述：有效性、像素尺寸、缓存键、文件引用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageLocation {
    file: Option<CloudLocation>,
    width: u32,
    height: u32,
}

impl ImageLocation {
    pub fn new(file: CloudLocation, width: u32, height: u32) -> Self {
        Self {
            file: Some(file),
            width,
            height,
        }
    }

    /// 无效位置（尚未从服务端获知该档位）
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> bool {
        self.file.is_some()
    }

    pub fn file(&self) -> Option<&CloudLocation> {
        self.file.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cache_key(&self) -> Option<String> {
        self.file.as_ref().map(|f| f.cache_key())
    }

    /// 就地替换文件引用；空引用不覆盖已有值
    pub fn refresh_file_reference(&mut self, value: &Bytes) {
        if value.is_empty() {
            return;
        }
        if let Some(file) = &mut self.file {
            file.file_reference = value.clone();
        }
    }
}

/// 变体更新载荷：位置 + 字节大小 + 可选预加载数据
#[derive(Debug, Clone, Default)]
pub struct ImageWithLocation {
    pub location: ImageLocation,
    pub byte_size: u64,
    /// 预加载的图像字节，空表示没有
    pub preloaded: Bytes,
}

/// 已加载的图像数据
///
/// 字节仍为编码后的格式（JPEG/WebP），解码交给 UI 层；宽高为 0 表示未知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// 云端文件状态标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloudFileFlags {
    /// 用户取消过加载；自动下载不再重试
    pub cancelled: bool,
    /// 上次加载失败
    pub failed: bool,
}

/// 云端文件：远端资源描述 + 本地加载状态
#[derive(Debug, Default)]
pub struct CloudFile {
    pub location: ImageLocation,
    pub byte_size: u64,
    pub flags: CloudFileFlags,
    /// 活动的加载器；每个档位最多一个
    pub loader: Option<Arc<FileLoader>>,
}
