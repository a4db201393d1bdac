use crate::service::feed::{ChangeEvent, ChangeFeed};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const CHANGE_CHANNEL: &str = "collection_changes";

/// 将 Postgres LISTEN/NOTIFY 转发到变更订阅
pub async fn spawn_pg_listener(
    pool: &PgPool,
    feed: Arc<ChangeFeed>,
) -> Result<JoinHandle<()>, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    tracing::info!("Listening for changes on channel {}", CHANGE_CHANNEL);

    Ok(tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => {
                    match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                        Ok(event) => {
                            tracing::debug!("Change {:?} on {} {}", event.op, event.collection, event.id);
                            feed.publish(event);
                        }
                        Err(e) => {
                            tracing::warn!("Ignoring malformed change payload {:?}: {}", notification.payload(), e);
                        }
                    }
                }
                Err(e) => {
                    // PgListener 会自动重连
                    tracing::error!("Change listener error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }))
}
