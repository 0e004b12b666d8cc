//! 媒体数据模型模块

pub mod location;
pub mod photo;

// 重新导出常用类型
pub use location::*;
pub use photo::*;
