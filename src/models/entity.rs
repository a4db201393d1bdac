use super::validation::ValidationErrors;
use crate::table::Column;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 数据集合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Products,
    Categories,
    Providers,
    Users,
    Promotions,
    AccessRequests,
}

impl CollectionKind {
    pub fn table(self) -> &'static str {
        match self {
            CollectionKind::Products => "products",
            CollectionKind::Categories => "categories",
            CollectionKind::Providers => "providers",
            CollectionKind::Users => "profiles",
            CollectionKind::Promotions => "promotions",
            CollectionKind::AccessRequests => "access_requests",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// 后台集合中保存的文档
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const KIND: CollectionKind;

    /// 用户只能通过用户管理流程创建
    const CREATABLE: bool = true;

    fn validate(&self) -> Result<(), ValidationErrors>;

    /// 唯一约束名 → 冲突字段
    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    fn columns() -> Vec<Column>;

    /// 只能通过专门接口修改的字段, 合并补丁不得改动
    fn read_only_fields() -> &'static [&'static str] {
        &[]
    }

    /// 文档引用的对象存储 key
    fn object_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn field_for_constraint(constraint: &str) -> Option<&'static str> {
        Self::unique_fields()
            .iter()
            .find(|(name, _)| *name == constraint)
            .map(|(_, field)| *field)
    }
}

/// 带主键和时间戳的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: i64,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
