pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod pricing;
pub mod service;
pub mod table;
pub mod wizard;

pub use config::AppConfig;
pub use db::{create_pool, run_migrations};
pub use error::{AppError, AppResult};
pub use service::{Catalog, StorageService, UserAdminService};
