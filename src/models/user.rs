use super::entity::{CollectionKind, Entity};
use super::validation::ValidationErrors;
use crate::table::{CellPreset, Column};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    #[default]
    Member,
}

/// 认证账号 (auth_users)
#[derive(Debug, Clone, FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// 用户资料 (profiles)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Entity for UserProfile {
    const KIND: CollectionKind = CollectionKind::Users;
    const CREATABLE: bool = false;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.email("email", &self.email);
        errors.required("full_name", &self.full_name);
        errors.into_result()
    }

    // 邮箱与 auth_users 保持一致
    fn read_only_fields() -> &'static [&'static str] {
        &["email"]
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("full_name", "Name", CellPreset::Text).searchable(),
            Column::new("email", "E-mail", CellPreset::Text).searchable(),
            Column::new("role", "Role", CellPreset::Badge),
            Column::new("active", "Active", CellPreset::Boolean),
            Column::new("created_at", "Created", CellPreset::Date),
        ]
    }
}

/// 创建用户请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.email("email", &self.email);
        check_password(&mut errors, &self.password);
        errors.required("full_name", &self.full_name);
        errors.into_result()
    }
}

pub fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

/// 创建成功后返回的用户
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}
