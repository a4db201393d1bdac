use super::SuccessResponse;
use crate::error::{AppError, AppResult};
use crate::models::{AccessRequest, Category, Product, Promotion, Provider, UserProfile};
use crate::service::{Catalog, CatalogEntity};
use crate::table::{export_csv, SortSpec, TableQuery};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, patch},
    Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// 列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub format: Option<String>,
}

pub fn routes(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .merge(collection::<Product>("products"))
        .merge(collection::<Category>("categories"))
        .merge(collection::<Provider>("providers"))
        .merge(collection::<UserProfile>("users"))
        .merge(collection::<Promotion>("promotions"))
        .merge(collection::<AccessRequest>("access_requests"))
        .with_state(catalog)
}

fn collection<T: CatalogEntity>(name: &str) -> Router<Arc<Catalog>> {
    Router::new()
        .route(&format!("/api/{}", name), get(list::<T>).post(create::<T>))
        .route(&format!("/api/{}/changes", name), get(changes::<T>))
        .route(
            &format!("/api/{}/:id", name),
            patch(update::<T>).delete(delete::<T>),
        )
}

/// 列表: 搜索、排序, `format=csv` 时导出
pub async fn list<T: CatalogEntity>(
    State(catalog): State<Arc<Catalog>>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let records = catalog.list::<T>().await?;
    let rows = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let columns = T::columns();
    let query = TableQuery {
        search: params.q,
        filters: Vec::new(),
        sort: params
            .sort
            .as_deref()
            .map(SortSpec::parse_list)
            .unwrap_or_default(),
    };
    let rows = query.apply(&columns, rows);

    match params.format.as_deref() {
        None | Some("json") => Ok(Json(rows).into_response()),
        Some("csv") => {
            let body = export_csv(&columns, &rows).map_err(|e| AppError::Internal(e.to_string()))?;
            let disposition = format!("attachment; filename=\"{}.csv\"", T::KIND);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        Some(other) => Err(AppError::BadRequest(format!("Unsupported format: {}", other))),
    }
}

pub async fn create<T: CatalogEntity>(
    State(catalog): State<Arc<Catalog>>,
    Json(data): Json<T>,
) -> AppResult<Response> {
    let record = catalog.create(data).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// PATCH 使用 JSON merge patch
pub async fn update<T: CatalogEntity>(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> AppResult<Response> {
    let record = catalog.update::<T>(id, &patch).await?;
    Ok(Json(record).into_response())
}

pub async fn delete<T: CatalogEntity>(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<i64>,
) -> AppResult<Json<SuccessResponse>> {
    catalog.delete::<T>(id).await?;
    Ok(Json(SuccessResponse::with_id(id)))
}

/// SSE 变更推送, 落后的客户端收到 `resync` 后需重新加载列表
pub async fn changes<T: CatalogEntity>(
    State(catalog): State<Arc<Catalog>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = catalog.feed().receiver(T::KIND);
    let events = stream::unfold(rx, |mut rx| async move {
        let event = match rx.recv().await {
            Ok(change) => Event::default()
                .event("change")
                .json_data(&change)
                .unwrap_or_else(|_| Event::default().event("resync")),
            Err(RecvError::Lagged(skipped)) => {
                Event::default().event("resync").data(skipped.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(event), rx))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}
