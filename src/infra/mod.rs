// Infrastructure layer - 基础设施层
// 缓存后端、下载管理、事件总线

pub mod cache;
pub mod downloader;
pub mod event_bus;

// 重新导出主要类型
pub use cache::{DiskMediaCache, MediaCache, MemoryMediaCache};
pub use downloader::{DownloadManager, FileLoader, LoadFromCloud, Transport};
pub use event_bus::MediaEventBus;
