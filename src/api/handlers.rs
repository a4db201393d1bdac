use serde::Serialize;

/// 通用成功响应体
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            id: None,
        }
    }

    pub fn with_id(id: i64) -> Self {
        Self {
            success: true,
            id: Some(id),
        }
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}
