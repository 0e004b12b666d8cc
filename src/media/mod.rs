//! 照片实体层：实体本身、活动视图、引用预览与用户操作

pub mod actions;
pub mod cloud_file;
pub mod photo;
pub mod photo_media;
pub mod reply_preview;

pub use photo::Photo;
pub use photo_media::PhotoMedia;
pub use reply_preview::ReplyPreview;
