pub mod collections;
pub mod listener;
pub mod pool;
pub mod users;

pub use collections::{PgCollectionStore, PgStores};
pub use listener::spawn_pg_listener;
pub use pool::{create_pool, run_migrations};
pub use users::PgUserDirectory;

use crate::error::AppError;
use crate::models::Entity;

/// 唯一约束冲突映射为字段级错误
pub(crate) fn map_write_error<T: Entity>(err: sqlx::Error) -> AppError {
    match AppError::unique_violation(&err) {
        Some(constraint) => AppError::Conflict {
            field: T::field_for_constraint(&constraint)
                .map(str::to_string)
                .unwrap_or(constraint),
        },
        None => AppError::Database(err),
    }
}
