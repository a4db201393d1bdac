use crate::error::AppResult;
use crate::models::{
    AccessRequest, Category, CollectionKind, Entity, NewUser, Product, Promotion, Provider,
    Record, User, UserProfile,
};
use crate::service::collections::{CollectionStore, LiveCollection};
use crate::service::feed::ChangeFeed;
use crate::service::storage::StorageService;
use crate::service::users::UserAdminService;
use serde_json::Value;
use std::sync::Arc;

/// 为每个集合创建底层存储
pub trait StoreFactory {
    fn store<T: Entity>(&self) -> Arc<dyn CollectionStore<T>>;

    /// users 集合必须读取用户目录写入的资料
    fn users(&self) -> Arc<dyn CollectionStore<UserProfile>>;
}

/// 管理后台的全部数据集合
pub struct Catalog {
    pub products: LiveCollection<Product>,
    pub categories: LiveCollection<Category>,
    pub providers: LiveCollection<Provider>,
    pub users: LiveCollection<UserProfile>,
    pub promotions: LiveCollection<Promotion>,
    pub access_requests: LiveCollection<AccessRequest>,
    feed: Arc<ChangeFeed>,
    storage: Arc<StorageService>,
    user_admin: Arc<UserAdminService>,
}

impl Catalog {
    pub fn new<F: StoreFactory>(
        stores: &F,
        feed: Arc<ChangeFeed>,
        storage: Arc<StorageService>,
        user_admin: Arc<UserAdminService>,
    ) -> Self {
        Self {
            products: LiveCollection::new(stores.store(), &feed),
            categories: LiveCollection::new(stores.store(), &feed),
            providers: LiveCollection::new(stores.store(), &feed),
            users: LiveCollection::new(stores.users(), &feed),
            promotions: LiveCollection::new(stores.store(), &feed),
            access_requests: LiveCollection::new(stores.store(), &feed),
            feed,
            storage,
            user_admin,
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub async fn list<T: CatalogEntity>(&self) -> AppResult<Arc<Vec<Record<T>>>> {
        T::live(self).list().await
    }

    pub async fn create<T: CatalogEntity>(&self, data: T) -> AppResult<Record<T>> {
        T::live(self).create(data).await
    }

    pub async fn update<T: CatalogEntity>(&self, id: i64, patch: &Value) -> AppResult<Record<T>> {
        T::live(self).update(id, patch).await
    }

    /// 先删除记录, 再删除其引用的对象; 对象删除失败只记日志。
    /// 用户走认证记录删除, 资料随外键级联删除。
    pub async fn delete<T: CatalogEntity>(&self, id: i64) -> AppResult<()> {
        if T::KIND == CollectionKind::Users {
            return self.delete_user(id).await;
        }
        let live = T::live(self);
        let record = live.get(id).await?;
        live.delete(id).await?;

        let keys = record.data.object_keys();
        if !keys.is_empty() {
            let results = self.storage.delete_many(&keys).await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            if failed > 0 {
                tracing::warn!(
                    "{} {} deleted, {} of {} objects left behind",
                    T::KIND,
                    id,
                    failed,
                    keys.len()
                );
            }
        }
        Ok(())
    }

    pub async fn create_user(&self, req: NewUser) -> AppResult<User> {
        let user = self.user_admin.create_user(req).await?;
        self.users.invalidate();
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.user_admin.delete_user(id).await?;
        self.users.invalidate();
        Ok(())
    }

    pub async fn change_password(&self, id: i64, password: String) -> AppResult<()> {
        self.user_admin.change_password(id, password).await
    }
}

/// 实体类型到 [`Catalog`] 中集合的映射
pub trait CatalogEntity: Entity {
    fn live(catalog: &Catalog) -> &LiveCollection<Self>;
}

impl CatalogEntity for Product {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.products
    }
}

impl CatalogEntity for Category {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.categories
    }
}

impl CatalogEntity for Provider {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.providers
    }
}

impl CatalogEntity for UserProfile {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.users
    }
}

impl CatalogEntity for Promotion {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.promotions
    }
}

impl CatalogEntity for AccessRequest {
    fn live(catalog: &Catalog) -> &LiveCollection<Self> {
        &catalog.access_requests
    }
}
