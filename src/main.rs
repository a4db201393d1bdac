use std::sync::Arc;
use storefront_admin::db::{spawn_pg_listener, PgStores, PgUserDirectory};
use storefront_admin::service::{ChangeFeed, LocalObjectStore};
use storefront_admin::{
    api, create_pool, run_migrations, AppConfig, Catalog, StorageService, UserAdminService,
};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config.server);
    info!("Storage: {:?}", config.storage);

    // 数据库连接池 + 迁移
    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    info!("Database pool created, migrations applied");

    // 变更订阅: Postgres NOTIFY → 广播
    let feed = Arc::new(ChangeFeed::new(config.feed.capacity));
    let _listener = spawn_pg_listener(&pool, feed.clone()).await?;

    // 服务
    let object_store = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
    let storage = Arc::new(StorageService::new(config.storage.clone(), object_store));
    let users = Arc::new(UserAdminService::new(Arc::new(PgUserDirectory::new(pool.clone()))));
    let catalog = Arc::new(Catalog::new(&PgStores::new(pool), feed, storage.clone(), users));

    let app = api::router(catalog, storage);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET|POST     /api/{{collection}}            - list (q, sort, format=csv) / create");
    info!("  PATCH|DELETE /api/{{collection}}/:id        - merge-patch update / delete");
    info!("  GET          /api/{{collection}}/changes    - change events (SSE)");
    info!("  POST         /storage/presign-upload       - signed upload URLs");
    info!("  GET          /storage/presign-read         - signed read URL");
    info!("  DELETE       /storage/object               - delete object");
    info!("  POST|DELETE  /users, POST /users/change-password");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
