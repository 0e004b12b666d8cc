use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use privchat_media::{
    cancel_photo, open_photo, save_photo, CloudLocation, FileOrigin, ImageLocation,
    ImageWithLocation, MediaConfig, MediaEvent, MediaSession, PhotoId, PhotoSize, PhotoUpdate,
    Result, Transport,
};

struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn fetch_chunk(
        &self,
        _location: &CloudLocation,
        _origin: FileOrigin,
        _offset: u64,
        _limit: u64,
    ) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

fn session() -> MediaSession {
    MediaSession::with_default_cache(Arc::new(NullTransport), MediaConfig::default())
}

fn variant(file_id: u64, width: u32, height: u32, byte_size: u64) -> ImageWithLocation {
    ImageWithLocation {
        location: ImageLocation::new(
            CloudLocation::new(file_id, Bytes::from_static(b"ref-a")),
            width,
            height,
        ),
        byte_size,
        preloaded: Bytes::new(),
    }
}

fn full_update(id: u64) -> PhotoUpdate {
    PhotoUpdate {
        id: PhotoId(id),
        date: 1_700_000_000,
        dc_id: 4,
        access_hash: 12345,
        file_reference: Bytes::from_static(b"ref-a"),
        inline_thumbnail: Bytes::from_static(b"tiny"),
        small: variant(1, 90, 60, 3),
        thumbnail: variant(2, 320, 213, 5),
        large: variant(3, 2560, 1920, 9),
    }
}

#[tokio::test]
async fn test_display_size_respects_side_limit() {
    let session = session();
    let photo = session.process_photo(full_update(1));

    // 大图超过单边上限，等比缩小
    assert_eq!(photo.size(PhotoSize::Large), Some((1280, 960)));
    // 小图不缩放
    assert_eq!(photo.size(PhotoSize::Small), Some((90, 60)));

    // 没有任何位置的照片没有展示尺寸
    let empty = session.photo(PhotoId(99));
    assert!(empty.is_null());
    assert_eq!(empty.size(PhotoSize::Large), None);
}

#[tokio::test]
async fn test_upload_progress_and_album_wait() {
    let session = session();
    let photo = session.photo(PhotoId(2));

    assert!(!photo.uploading());
    assert_eq!(photo.progress(), 0.0);

    photo.start_upload(100);
    assert!(photo.uploading());
    assert!(photo.display_loading());

    photo.set_upload_progress(50);
    assert_eq!(photo.progress(), 0.5);

    // 超出总量的进度被截断
    photo.set_upload_progress(150);
    assert_eq!(photo.progress(), 1.0);

    photo.set_waiting_for_album();
    assert!(photo.waiting_for_album());
    // 等相册时不展示进度
    assert!(!photo.display_loading());

    photo.finish_upload();
    assert!(!photo.uploading());
    assert!(!photo.waiting_for_album());
    assert_eq!(photo.progress(), 0.0);
}

#[tokio::test]
async fn test_sent_at_conversion() {
    let session = session();
    let unknown = session.photo(PhotoId(20));
    assert_eq!(unknown.date(), 0);
    assert!(unknown.sent_at().is_none());

    let photo = session.process_photo(full_update(21));
    assert_eq!(photo.date(), 1_700_000_000);
    assert_eq!(photo.sent_at().unwrap().timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn test_remote_location_and_file_reference() {
    let session = session();
    let photo = session.process_photo(full_update(3));

    let input = photo.input_photo();
    assert_eq!(input.id, PhotoId(3));
    assert_eq!(input.access_hash, 12345);
    assert_eq!(input.file_reference.as_ref(), b"ref-a");

    // 引用过期刷新：照片级与各档位一起替换
    photo.refresh_file_reference(&Bytes::from_static(b"ref-b"));
    assert_eq!(photo.file_reference().as_ref(), b"ref-b");
    for size in PhotoSize::ALL {
        let location = photo.location(size);
        assert_eq!(location.file().unwrap().file_reference.as_ref(), b"ref-b");
    }
}

#[tokio::test]
async fn test_inline_thumbnail_adopted_once() {
    let session = session();
    let photo = session.process_photo(full_update(4));
    let media = photo.create_media_view();

    assert_eq!(media.thumbnail_inline().unwrap().bytes.as_ref(), b"tiny");

    // 后续更新不会覆盖已有的内联缩略图
    let mut update = full_update(4);
    update.inline_thumbnail = Bytes::from_static(b"other");
    session.process_photo(update);
    assert_eq!(photo.inline_thumbnail_bytes().as_ref(), b"tiny");
}

#[tokio::test]
async fn test_preloaded_bytes_reach_media_view() {
    let session = session();
    let photo = session.photo(PhotoId(5));
    let media = photo.create_media_view();

    let mut update = full_update(5);
    update.thumbnail.preloaded = Bytes::from_static(b"preloaded-thumb");
    session.process_photo(update);

    let view = media.image(PhotoSize::Thumbnail).expect("preloaded view");
    assert_eq!(view.bytes.as_ref(), b"preloaded-thumb");
    assert_eq!(view.width, 320);

    // any_image 取最大可用档位
    assert_eq!(media.any_image().unwrap().bytes.as_ref(), b"preloaded-thumb");
}

#[tokio::test]
async fn test_open_action_requires_large_location() {
    let session = session();
    let mut rx = session.events().subscribe();

    // 没有大图位置：忽略
    let empty = session.photo(PhotoId(6));
    open_photo(&empty, FileOrigin::default());

    let photo = session.process_photo(full_update(7));
    open_photo(&photo, FileOrigin::message(3, 8));

    match rx.try_recv().unwrap() {
        MediaEvent::PhotoOpenRequested { photo_id, origin } => {
            assert_eq!(photo_id, PhotoId(7));
            assert_eq!(origin, FileOrigin::message(3, 8));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_save_action_ignores_dateless_photo() {
    let session = session();
    let photo = session.photo(PhotoId(8));

    // 尚未从服务端获知：不触发加载
    save_photo(&photo, FileOrigin::default());
    assert!(!photo.loading());
}

#[tokio::test]
async fn test_cancel_action_routes_by_transfer_kind() {
    let session = session();
    let photo = session.process_photo(full_update(9));
    let mut rx = session.events().subscribe();
    let origin = FileOrigin::message(1, 5);

    // 上传中：交给 UI 弹层确认
    photo.start_upload(10);
    cancel_photo(&photo, origin);
    match rx.try_recv().unwrap() {
        MediaEvent::UploadCancelRequested { photo_id, origin: event_origin } => {
            assert_eq!(photo_id, PhotoId(9));
            assert_eq!(event_origin, origin);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(photo.uploading());

    // 非上传：直接走下载取消路径（当前无加载器，静默）
    photo.finish_upload();
    cancel_photo(&photo, origin);
    assert!(!photo.loading());
}

#[tokio::test]
async fn test_media_view_weak_semantics() {
    let session = session();
    let photo = session.process_photo(full_update(10));

    assert!(photo.active_media_view().is_none());
    let media = photo.create_media_view();
    let again = photo.create_media_view();
    assert!(Arc::ptr_eq(&media, &again));
    assert!(photo.active_media_view().is_some());

    drop(media);
    drop(again);
    // 最后一个使用者释放后视图消失
    assert!(photo.active_media_view().is_none());
}
