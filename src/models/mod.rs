pub mod catalog;
pub mod entity;
pub mod user;
pub mod validation;

pub use catalog::{
    AccessRequest, AccessRequestStatus, Category, Product, Promotion, Provider, ProviderStatus,
    SaleMode, MAX_PRODUCT_IMAGES,
};
pub use entity::{CollectionKind, Entity, Record};
pub use user::{AuthUser, NewUser, Role, User, UserProfile};
pub use validation::{FieldError, ValidationErrors};
