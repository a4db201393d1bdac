pub mod catalog;
pub mod collections;
pub mod feed;
pub mod memory;
pub mod storage;
pub mod users;

pub use catalog::{Catalog, CatalogEntity, StoreFactory};
pub use collections::{merge_patch, CollectionStore, LiveCollection};
pub use feed::{ChangeEvent, ChangeFeed, ChangeOp, Subscription};
pub use memory::{MemoryCollectionStore, MemoryStores, MemoryUserDirectory};
pub use storage::{LocalObjectStore, ObjectStore, StorageService, UrlSigner};
pub use users::{UserAdminService, UserDirectory};
