use std::sync::Arc;
use bytes::Bytes;
use tracing::debug;

use crate::infra::cache::MediaCache;
use crate::infra::downloader::{DownloadManager, LoadFromCloud, LoaderUpdate};
use crate::model::location::{CloudFile, CloudFileFlags, ImageWithLocation};
use crate::model::photo::FileOrigin;

/// 加载请求的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadOutcome {
    /// 新建了加载器
    Started,
    /// 已有加载器在工作（最多只会把本地优先升级为允许云端）
    AlreadyLoading,
    /// 活动视图已有该图像，或被取消标志拦截，无需加载
    Skipped,
    /// 位置无效，已置失败标志
    FailedInvalid,
}

/// 启动某一档位云端文件的加载
///
/// 不变量：每个档位最多一个活动加载器。回调只会从下载任务里触发，
/// 绝不在当前调用栈上同步执行。
pub(crate) fn load_cloud_file(
    file: &mut CloudFile,
    origin: FileOrigin,
    from_cloud: LoadFromCloud,
    auto_loading: bool,
    manager: &DownloadManager,
    should_load: impl FnOnce() -> bool,
    on_update: impl Fn(LoaderUpdate) + Send + Sync + 'static,
) -> LoadOutcome {
    if let Some(loader) = &file.loader {
        if from_cloud == LoadFromCloud::Allow {
            loader.permit_cloud();
        }
        return LoadOutcome::AlreadyLoading;
    }
    if file.flags.cancelled && auto_loading {
        return LoadOutcome::Skipped;
    }
    let location = match file.location.file() {
        Some(location) => location.clone(),
        None => {
            file.flags.failed = true;
            return LoadOutcome::FailedInvalid;
        }
    };
    if !should_load() {
        return LoadOutcome::Skipped;
    }
    // 手动触发的加载清除取消标志
    file.flags.cancelled = false;
    file.loader = Some(manager.start(
        location,
        origin,
        file.byte_size,
        from_cloud,
        auto_loading,
        on_update,
    ));
    LoadOutcome::Started
}

/// 应用服务端下发的变体描述
///
/// 位置变化时取消进行中的加载并通过 `restart_load` 在新位置重启；
/// 载荷自带预加载数据时写入缓存并交给 `any_preloaded`。
pub(crate) fn update_cloud_file(
    file: &mut CloudFile,
    data: &ImageWithLocation,
    cache: &Arc<dyn MediaCache>,
    restart_load: impl FnOnce(FileOrigin),
    any_preloaded: impl FnOnce(Bytes),
) {
    if !data.location.valid() {
        return;
    }
    let new_id = data.location.file().map(|f| f.file_id);
    let old_id = file.location.file().map(|f| f.file_id);
    let location_changed = file.location.valid() && old_id != new_id;
    let first_valid = !file.location.valid();

    if location_changed {
        debug!(
            "Photo variant location changed: {:?} -> {:?}",
            old_id, new_id
        );
        let active = file.loader.take();
        file.location = data.location.clone();
        if data.byte_size > 0 {
            file.byte_size = data.byte_size;
        }
        file.flags = CloudFileFlags::default();
        if let Some(loader) = active {
            let origin = loader.origin();
            loader.cancel();
            restart_load(origin);
        }
    } else {
        // 同一远端文件：吸收新的引用和尺寸信息
        file.location = data.location.clone();
        if data.byte_size > 0 {
            file.byte_size = data.byte_size;
        }
        if first_valid {
            file.flags = CloudFileFlags::default();
        }
    }

    if !data.preloaded.is_empty() {
        if let Some(key) = file.location.cache_key() {
            let cache = cache.clone();
            let bytes = data.preloaded.clone();
            tokio::spawn(async move {
                cache.put(&key, bytes).await;
            });
        }
        any_preloaded(data.preloaded.clone());
    }
}
