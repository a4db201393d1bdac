use crate::models::CollectionKind;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// 集合变更通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: CollectionKind,
    pub op: ChangeOp,
    pub id: i64,
}

/// 实时变更推送, 每个集合一个广播通道
pub struct ChangeFeed {
    capacity: usize,
    channels: DashMap<CollectionKind, broadcast::Sender<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
        }
    }

    fn sender(&self, kind: CollectionKind) -> broadcast::Sender<ChangeEvent> {
        self.channels
            .entry(kind)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// 返回收到事件的接收者数量
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender(event.collection).send(event).unwrap_or(0)
    }

    pub fn receiver(&self, kind: CollectionKind) -> broadcast::Receiver<ChangeEvent> {
        self.sender(kind).subscribe()
    }

    /// `kind` 每次变更都调用 `on_change`, 直到返回的订阅被丢弃。
    /// 丢失事件 (lag) 同样视为变更。
    pub fn watch<F>(&self, kind: CollectionKind, on_change: F) -> Subscription
    where
        F: Fn() + Send + 'static,
    {
        let mut rx = self.receiver(kind);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_) => on_change(),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Change feed for {} lagged by {} events", kind, skipped);
                        on_change();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription {
            kind,
            handle: Some(handle),
        }
    }
}

/// [`ChangeFeed::watch`] 的订阅句柄, 丢弃即取消订阅
pub struct Subscription {
    kind: CollectionKind,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn unsubscribe(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Unsubscribed from {} changes", self.kind);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}
