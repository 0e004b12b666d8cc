use std::env;
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// 媒体模块配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// 自动下载设置
    #[serde(default)]
    pub auto_download: AutoDownloadConfig,
    /// 缓存配置
    #[serde(default)]
    pub cache: MediaCacheConfig,
    /// 下载器配置
    #[serde(default)]
    pub loader: LoaderConfig,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 自动下载设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDownloadConfig {
    /// 是否自动下载照片
    pub photos: bool,
    /// 自动下载的照片大小上限（字节），超过则等待用户手动触发
    pub max_photo_bytes: u64,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaCacheConfig {
    /// 内存缓存最大条目数
    pub max_entries: u64,
    /// 内存缓存条目存活时间（秒）
    pub ttl_secs: u64,
    /// 磁盘缓存根目录，不配置则仅使用内存缓存
    pub disk_root: Option<String>,
}

/// 下载器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// 单次拉取的块大小（字节）
    pub chunk_size: u64,
    /// 失败重试次数上限
    pub max_retries: u32,
    /// 重试基础退避（毫秒），实际退避按次数指数放大并加抖动
    pub retry_backoff_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            auto_download: AutoDownloadConfig::default(),
            cache: MediaCacheConfig::default(),
            loader: LoaderConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AutoDownloadConfig {
    fn default() -> Self {
        Self {
            photos: true,
            max_photo_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            ttl_secs: 3600,
            disk_root: None,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 128 * 1024,
            max_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl MediaConfig {
    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;

        toml::from_str(&content).with_context(|| "配置文件格式错误")
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).with_context(|| "配置序列化失败")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("无法写入配置文件: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 加载配置：PRIVCHAT_MEDIA_CONFIG 指定路径，文件不存在时使用默认配置
    pub fn load() -> Result<Self> {
        let path = env::var("PRIVCHAT_MEDIA_CONFIG")
            .unwrap_or_else(|_| "media.toml".to_string());
        if !Path::new(&path).exists() {
            return Ok(Self::default());
        }
        let mut config = Self::from_toml_file(&path)?;
        config.merge_from_env()?;
        Ok(config)
    }

    /// 从环境变量合并配置（PRIVCHAT_MEDIA_ 前缀）
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(photos) = env::var("PRIVCHAT_MEDIA_AUTO_DOWNLOAD") {
            self.auto_download.photos = photos.parse().unwrap_or(self.auto_download.photos);
        }
        if let Ok(disk_root) = env::var("PRIVCHAT_MEDIA_CACHE_ROOT") {
            self.cache.disk_root = Some(disk_root);
        }
        if let Ok(log_level) = env::var("PRIVCHAT_MEDIA_LOG_LEVEL") {
            self.log_level = log_level;
        }
        Ok(())
    }
}
