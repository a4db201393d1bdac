use crate::error::AppResult;
use crate::service::storage::{
    DeleteObjectResponse, PresignReadResponse, PresignUploadRequest, PresignUploadResponse,
};
use crate::service::StorageService;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Json, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PresignReadParams {
    pub key: String,
    pub expires: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteObjectRequest {
    pub key: String,
}

/// 签名 URL 上的查询参数
#[derive(Debug, Deserialize)]
pub struct SignedParams {
    pub expires: i64,
    pub signature: String,
}

pub fn routes(storage: Arc<StorageService>) -> Router {
    let limit = storage.config().max_upload_bytes;
    let presign = Router::new()
        .route("/storage/presign-upload", post(presign_upload))
        .route("/storage/presign-read", get(presign_read))
        .route("/storage/object", delete(delete_object))
        .route("/public/*key", get(get_public));
    let objects = Router::new()
        .route("/objects/*key", get(get_object).put(put_object))
        .layer(DefaultBodyLimit::max(limit));

    presign.merge(objects).with_state(storage)
}

pub async fn presign_upload(
    State(storage): State<Arc<StorageService>>,
    Json(req): Json<PresignUploadRequest>,
) -> AppResult<Json<PresignUploadResponse>> {
    Ok(Json(storage.presign_upload(&req)?))
}

pub async fn presign_read(
    State(storage): State<Arc<StorageService>>,
    Query(params): Query<PresignReadParams>,
) -> AppResult<Json<PresignReadResponse>> {
    Ok(Json(storage.presign_read(&params.key, params.expires)?))
}

/// 删除对象, 对象不存在也视为成功
pub async fn delete_object(
    State(storage): State<Arc<StorageService>>,
    Json(req): Json<DeleteObjectRequest>,
) -> AppResult<Json<DeleteObjectResponse>> {
    Ok(Json(storage.delete(&req.key).await?))
}

pub async fn put_object(
    State(storage): State<Arc<StorageService>>,
    Path(key): Path<String>,
    Query(params): Query<SignedParams>,
    body: Bytes,
) -> AppResult<Json<DeleteObjectResponse>> {
    storage
        .put_signed(&key, params.expires, &params.signature, body.to_vec())
        .await?;
    Ok(Json(DeleteObjectResponse { success: true, key }))
}

pub async fn get_object(
    State(storage): State<Arc<StorageService>>,
    Path(key): Path<String>,
    Query(params): Query<SignedParams>,
) -> AppResult<Response> {
    let bytes = storage
        .get_signed(&key, params.expires, &params.signature)
        .await?;
    Ok(object_response(&key, bytes))
}

pub async fn get_public(
    State(storage): State<Arc<StorageService>>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    let bytes = storage.get_public(&key).await?;
    Ok(object_response(&key, bytes))
}

fn object_response(key: &str, bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type_for(key))], bytes).into_response()
}

fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("products/a-front.PNG"), "image/png");
        assert_eq!(content_type_for("providers/license.pdf"), "application/pdf");
        assert_eq!(content_type_for("misc/blob"), "application/octet-stream");
    }
}
