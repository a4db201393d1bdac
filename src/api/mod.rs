pub mod collections;
pub mod handlers;
pub mod storage;
pub mod users;

pub use handlers::{health_check, SuccessResponse};

use crate::service::{Catalog, StorageService};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// 构建完整路由: 每个服务一个子路由, 各自持有状态后合并
pub fn router(catalog: Arc<Catalog>, storage: Arc<StorageService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(collections::routes(catalog.clone()))
        .merge(storage::routes(storage))
        .merge(users::routes(catalog))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
