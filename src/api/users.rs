use super::SuccessResponse;
use crate::error::AppResult;
use crate::models::{NewUser, User};
use crate::service::Catalog;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub id: i64,
    pub password: String,
}

pub fn routes(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/users", post(create_user).delete(delete_user))
        .route("/users/change-password", post(change_password))
        .with_state(catalog)
}

/// 创建用户 (认证记录 + 资料)
pub async fn create_user(
    State(catalog): State<Arc<Catalog>>,
    Json(req): Json<NewUser>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let user = catalog.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { user })))
}

pub async fn delete_user(
    State(catalog): State<Arc<Catalog>>,
    Json(req): Json<DeleteUserRequest>,
) -> AppResult<Json<SuccessResponse>> {
    catalog.delete_user(req.id).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn change_password(
    State(catalog): State<Arc<Catalog>>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    catalog.change_password(req.id, req.password).await?;
    Ok(Json(SuccessResponse::ok()))
}
