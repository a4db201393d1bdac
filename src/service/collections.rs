use crate::error::{AppError, AppResult};
use crate::models::{Entity, Record, ValidationErrors};
use crate::service::feed::{ChangeFeed, Subscription};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 集合存储接口
#[async_trait]
pub trait CollectionStore<T: Entity>: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Record<T>>>;
    async fn get(&self, id: i64) -> AppResult<Option<Record<T>>>;
    async fn insert(&self, data: &T) -> AppResult<Record<T>>;
    async fn update(&self, id: i64, data: &T) -> AppResult<Option<Record<T>>>;
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

/// 整个集合的缓存视图
///
/// 收到任何变更通知即标记失效, 下次读取重新拉取全部记录。
/// 写入直接落到存储, 后写者生效。
pub struct LiveCollection<T: Entity> {
    store: Arc<dyn CollectionStore<T>>,
    cache: RwLock<Option<Arc<Vec<Record<T>>>>>,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl<T: Entity> LiveCollection<T> {
    pub fn new(store: Arc<dyn CollectionStore<T>>, feed: &ChangeFeed) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = stale.clone();
        let subscription = feed.watch(T::KIND, move || flag.store(true, Ordering::Release));
        Self {
            store,
            cache: RwLock::new(None),
            stale,
            _subscription: subscription,
        }
    }

    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub async fn list(&self) -> AppResult<Arc<Vec<Record<T>>>> {
        if !self.is_stale() {
            if let Some(rows) = self.cache.read().await.as_ref() {
                return Ok(rows.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // 先清除标记, 拉取期间到达的变更会再次触发刷新
        if !self.stale.swap(false, Ordering::AcqRel) {
            if let Some(rows) = cache.as_ref() {
                return Ok(rows.clone());
            }
        }
        match self.store.list().await {
            Ok(rows) => {
                tracing::debug!("Refetched {} ({} rows)", T::KIND, rows.len());
                let rows = Arc::new(rows);
                *cache = Some(rows.clone());
                Ok(rows)
            }
            Err(e) => {
                self.invalidate();
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<Record<T>> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", T::KIND, id)))
    }

    pub async fn create(&self, data: T) -> AppResult<Record<T>> {
        if !T::CREATABLE {
            return Err(AppError::BadRequest(format!(
                "{} cannot be created through this endpoint",
                T::KIND
            )));
        }
        data.validate()?;
        let record = self.store.insert(&data).await?;
        self.invalidate();
        tracing::info!("Created {} {}", T::KIND, record.id);
        Ok(record)
    }

    /// 对存储文档应用 JSON merge patch, 校验通过后写回
    pub async fn update(&self, id: i64, patch: &Value) -> AppResult<Record<T>> {
        let current = self.get(id).await?;
        let mut doc = serde_json::to_value(&current.data)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        check_read_only::<T>(&doc, patch)?;
        merge_patch(&mut doc, patch);
        let data: T = serde_json::from_value(doc)
            .map_err(|e| AppError::BadRequest(format!("Invalid {} patch: {}", T::KIND, e)))?;
        data.validate()?;
        let record = self
            .store
            .update(id, &data)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", T::KIND, id)))?;
        self.invalidate();
        tracing::info!("Updated {} {}", T::KIND, id);
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("{} {}", T::KIND, id)));
        }
        self.invalidate();
        tracing::info!("Deleted {} {}", T::KIND, id);
        Ok(())
    }
}

fn check_read_only<T: Entity>(doc: &Value, patch: &Value) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Value::Object(fields) = patch {
        for field in T::read_only_fields() {
            if let Some(value) = fields.get(*field) {
                if doc.get(*field) != Some(value) {
                    errors.add(field, "Cannot be changed here");
                }
            }
        }
    }
    errors.into_result()
}

/// RFC 7386 JSON merge patch, `null` 删除键
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}
