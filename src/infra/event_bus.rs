use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::events::MediaEvent;

/// In-process Event Bus（进程内媒体事件总线）
///
/// 使用 tokio::sync::broadcast；UI 层订阅后在自己的任务里消费，
/// 消费跟不上时允许丢事件（broadcast 语义）。
pub struct MediaEventBus {
    sender: broadcast::Sender<MediaEvent>,
}

impl MediaEventBus {
    /// 创建新的事件总线
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// 发布事件；没有任何订阅者时静默丢弃
    pub fn publish(&self, event: MediaEvent) {
        if let Err(e) = self.sender.send(event) {
            trace!("No media event subscribers: {}", e);
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.sender.subscribe()
    }
}

impl Default for MediaEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::photo::PhotoId;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = MediaEventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(MediaEvent::PhotoLoadDone { photo_id: PhotoId(1) });

        match rx.recv().await.unwrap() {
            MediaEvent::PhotoLoadDone { photo_id } => assert_eq!(photo_id, PhotoId(1)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MediaEventBus::new();
        // 不应 panic，也不应报错
        bus.publish(MediaEvent::PhotoLoadProgress { photo_id: PhotoId(2) });
    }
}
