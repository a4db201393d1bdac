use super::entity::{CollectionKind, Entity};
use super::validation::{is_sku, ValidationErrors};
use crate::pricing::{Unit, UnitPriceEntry};
use crate::table::{CellPreset, Column};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_PRODUCT_IMAGES: usize = 8;

/// 销售方式: 按件或散装称重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SaleMode {
    Unit {
        price: f64,
    },
    Bulk {
        base_unit: Unit,
        base_price: f64,
        units: Vec<UnitPriceEntry>,
    },
}

/// 商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub provider_id: Option<i64>,
    pub sale: SaleMode,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub members_only: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Entity for Product {
    const KIND: CollectionKind = CollectionKind::Products;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("name", &self.name);
        if !is_sku(&self.sku) {
            errors.add("sku", "SKU must be 2-40 letters, digits, '-' or '_'");
        }
        if self.stock < 0 {
            errors.add("stock", "Must be zero or greater");
        }
        if self.images.len() > MAX_PRODUCT_IMAGES {
            errors.add("images", format!("At most {} images", MAX_PRODUCT_IMAGES));
        }
        match &self.sale {
            SaleMode::Unit { price } => errors.non_negative("sale.price", Some(*price)),
            SaleMode::Bulk {
                base_unit,
                base_price,
                units,
            } => {
                errors.non_negative("sale.base_price", Some(*base_price));
                for entry in units {
                    if entry.unit == *base_unit {
                        errors.add("sale.units", "The base unit cannot be priced again");
                    }
                    if let Some(p) = entry.price {
                        if !p.is_finite() || p < 0.0 {
                            errors.add("sale.units", format!("Invalid price for {}", entry.unit));
                        }
                    }
                }
            }
        }
        errors.into_result()
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("products_sku_key", "sku")]
    }

    fn object_keys(&self) -> Vec<String> {
        self.images.clone()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", CellPreset::Text).searchable(),
            Column::new("sku", "SKU", CellPreset::Text).searchable(),
            Column::new("sale.mode", "Sale", CellPreset::Badge),
            Column::new("stock", "Stock", CellPreset::Text),
            Column::new("members_only", "Members only", CellPreset::Boolean),
            Column::new("active", "Active", CellPreset::Boolean),
            Column::new("updated_at", "Updated", CellPreset::Date),
        ]
    }
}

/// 商品分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub position: i32,
}

impl Entity for Category {
    const KIND: CollectionKind = CollectionKind::Categories;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("name", &self.name);
        if self.position < 0 {
            errors.add("position", "Must be zero or greater");
        }
        errors.into_result()
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("categories_name_key", "name")]
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", CellPreset::Text).searchable(),
            Column::new("description", "Description", CellPreset::Text).searchable(),
            Column::new("position", "Position", CellPreset::Text),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    #[default]
    Pending,
    Active,
    Suspended,
}

/// 供应商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub tax_id: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub status: ProviderStatus,
}

impl Entity for Provider {
    const KIND: CollectionKind = CollectionKind::Providers;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("name", &self.name);
        errors.required("tax_id", &self.tax_id);
        errors.required("contact_name", &self.contact_name);
        errors.email("email", &self.email);
        errors.required("phone", &self.phone);
        errors.into_result()
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("providers_tax_id_key", "tax_id")]
    }

    fn object_keys(&self) -> Vec<String> {
        self.documents.clone()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", CellPreset::Text).searchable(),
            Column::new("tax_id", "Tax ID", CellPreset::Text).searchable(),
            Column::new("contact_name", "Contact", CellPreset::Text).searchable(),
            Column::new("email", "E-mail", CellPreset::Text).searchable(),
            Column::new("status", "Status", CellPreset::Badge),
        ]
    }
}

/// 促销活动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_percent: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub product_ids: Vec<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Promotion {
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.active && self.starts_at <= now && now < self.ends_at
    }
}

impl Entity for Promotion {
    const KIND: CollectionKind = CollectionKind::Promotions;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("code", &self.code);
        errors.required("title", &self.title);
        if !(self.discount_percent > 0.0 && self.discount_percent <= 100.0) {
            errors.add("discount_percent", "Must be between 0 and 100");
        }
        if self.ends_at <= self.starts_at {
            errors.add("ends_at", "Must be after the start date");
        }
        errors.into_result()
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("promotions_code_key", "code")]
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("code", "Code", CellPreset::Text).searchable(),
            Column::new("title", "Title", CellPreset::Text).searchable(),
            Column::new("discount_percent", "Discount", CellPreset::Percent),
            Column::new("starts_at", "Starts", CellPreset::Date),
            Column::new("ends_at", "Ends", CellPreset::Date),
            Column::new("active", "Active", CellPreset::Boolean),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// 顾客入会申请
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub heard_from: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    pub terms_accepted: bool,
    #[serde(default)]
    pub status: AccessRequestStatus,
}

impl Entity for AccessRequest {
    const KIND: CollectionKind = CollectionKind::AccessRequests;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("full_name", &self.full_name);
        errors.email("email", &self.email);
        errors.required("phone", &self.phone);
        errors.required("heard_from", &self.heard_from);
        if !self.terms_accepted {
            errors.add("terms_accepted", "The terms must be accepted");
        }
        errors.into_result()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("full_name", "Name", CellPreset::Text).searchable(),
            Column::new("email", "E-mail", CellPreset::Text).searchable(),
            Column::new("phone", "Phone", CellPreset::Text),
            Column::new("status", "Status", CellPreset::Badge),
            Column::new("created_at", "Requested", CellPreset::Date),
        ]
    }
}

fn default_true() -> bool {
    true
}
