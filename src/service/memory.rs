use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Entity, Record, UserProfile};
use crate::service::catalog::StoreFactory;
use crate::service::collections::CollectionStore;
use crate::service::users::UserDirectory;
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// 进程内集合存储, 无数据库时使用
pub struct MemoryCollectionStore<T: Entity> {
    inner: Mutex<MemoryInner<T>>,
}

struct MemoryInner<T> {
    next_id: i64,
    rows: IndexMap<i64, Record<T>>,
}

impl<T: Entity> MemoryCollectionStore<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                next_id: 1,
                rows: IndexMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Entity> Default for MemoryCollectionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> CollectionStore<T> for MemoryCollectionStore<T> {
    async fn list(&self) -> AppResult<Vec<Record<T>>> {
        Ok(self.lock().rows.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> AppResult<Option<Record<T>>> {
        Ok(self.lock().rows.get(&id).cloned())
    }

    async fn insert(&self, data: &T) -> AppResult<Record<T>> {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let now = Utc::now();
        let record = Record {
            id,
            data: data.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, data: &T) -> AppResult<Option<Record<T>>> {
        let mut inner = self.lock();
        Ok(inner.rows.get_mut(&id).map(|record| {
            record.data = data.clone();
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().rows.shift_remove(&id).is_some())
    }
}

/// 内存存储工厂; users 集合直接读取用户目录中的资料
#[derive(Default, Clone)]
pub struct MemoryStores {
    directory: Arc<MemoryUserDirectory>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> Arc<MemoryUserDirectory> {
        self.directory.clone()
    }
}

impl StoreFactory for MemoryStores {
    fn store<T: Entity>(&self) -> Arc<dyn CollectionStore<T>> {
        Arc::new(MemoryCollectionStore::<T>::new())
    }

    fn users(&self) -> Arc<dyn CollectionStore<UserProfile>> {
        self.directory.clone()
    }
}

/// 内存用户目录
#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: Mutex<UserRows>,
}

#[derive(Default)]
struct UserRows {
    next_id: i64,
    // id → (email, 密码哈希)
    auth: IndexMap<i64, (String, String)>,
    profiles: IndexMap<i64, Record<UserProfile>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password_hash(&self, id: i64) -> Option<String> {
        self.lock().auth.get(&id).map(|(_, hash)| hash.clone())
    }

    pub fn profile(&self, id: i64) -> Option<UserProfile> {
        self.lock().profiles.get(&id).map(|r| r.data.clone())
    }

    pub fn user_count(&self) -> usize {
        self.lock().auth.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UserRows> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn insert_auth_user(&self, email: &str, password_hash: &str) -> AppResult<AuthUser> {
        let mut rows = self.lock();
        if rows.auth.values().any(|(e, _)| e == email) {
            return Err(AppError::DuplicateEmail(email.to_string()));
        }
        rows.next_id += 1;
        let id = rows.next_id;
        rows.auth
            .insert(id, (email.to_string(), password_hash.to_string()));
        Ok(AuthUser {
            id,
            email: email.to_string(),
            created_at: Utc::now(),
        })
    }

    // 与 profiles 外键 ON DELETE CASCADE 一致
    async fn delete_auth_user(&self, id: i64) -> AppResult<bool> {
        let mut rows = self.lock();
        rows.profiles.shift_remove(&id);
        Ok(rows.auth.shift_remove(&id).is_some())
    }

    async fn insert_profile(&self, id: i64, profile: &UserProfile) -> AppResult<()> {
        let mut rows = self.lock();
        if !rows.auth.contains_key(&id) {
            return Err(AppError::NotFound(format!("user {}", id)));
        }
        let now = Utc::now();
        rows.profiles.insert(
            id,
            Record {
                id,
                data: profile.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<bool> {
        Ok(self
            .lock()
            .auth
            .get_mut(&id)
            .map(|(_, hash)| *hash = password_hash.to_string())
            .is_some())
    }
}

#[async_trait]
impl CollectionStore<UserProfile> for MemoryUserDirectory {
    async fn list(&self) -> AppResult<Vec<Record<UserProfile>>> {
        Ok(self.lock().profiles.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> AppResult<Option<Record<UserProfile>>> {
        Ok(self.lock().profiles.get(&id).cloned())
    }

    async fn insert(&self, _data: &UserProfile) -> AppResult<Record<UserProfile>> {
        Err(AppError::BadRequest(
            "profiles are created together with their user".to_string(),
        ))
    }

    async fn update(&self, id: i64, data: &UserProfile) -> AppResult<Option<Record<UserProfile>>> {
        Ok(self.lock().profiles.get_mut(&id).map(|record| {
            record.data = data.clone();
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().profiles.shift_remove(&id).is_some())
    }
}
