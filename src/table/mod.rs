//! 后台通用数据表, 在 JSON 行上做查询与渲染

pub mod selection;

pub use selection::{Selection, SelectionMode};

use chrono::DateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// 预设单元格渲染方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellPreset {
    Text,
    Currency,
    Percent,
    Date,
    Boolean,
    Badge,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub preset: CellPreset,
    pub sortable: bool,
    pub searchable: bool,
}

impl Column {
    pub fn new(key: &'static str, label: &'static str, preset: CellPreset) -> Self {
        Self {
            key,
            label,
            preset,
            sortable: true,
            searchable: false,
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// 解析 `name,-price`, 前缀 `-` 表示降序
    pub fn parse_list(raw: &str) -> Vec<SortSpec> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "-")
            .map(|s| match s.strip_prefix('-') {
                Some(field) => SortSpec {
                    field: field.to_string(),
                    direction: SortDirection::Desc,
                },
                None => SortSpec {
                    field: s.to_string(),
                    direction: SortDirection::Asc,
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ColumnFilter {
    Equals {
        field: String,
        value: Value,
    },
    Contains {
        field: String,
        needle: String,
    },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl ColumnFilter {
    fn matches(&self, row: &Value) -> bool {
        match self {
            ColumnFilter::Equals { field, value } => lookup(row, field) == Some(value),
            ColumnFilter::Contains { field, needle } => lookup(row, field)
                .map(|v| contains_ci(v, &needle.to_lowercase()))
                .unwrap_or(false),
            ColumnFilter::Range { field, min, max } => {
                let Some(n) = lookup(row, field).and_then(Value::as_f64) else {
                    return false;
                };
                min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
            }
        }
    }
}

/// 表格查询条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filters: Vec<ColumnFilter>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
}

impl TableQuery {
    pub fn apply(&self, columns: &[Column], rows: Vec<Value>) -> Vec<Value> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let searchable: Vec<&str> = columns
            .iter()
            .filter(|c| c.searchable)
            .map(|c| c.key)
            .collect();
        let sort: Vec<&SortSpec> = self
            .sort
            .iter()
            .filter(|s| columns.iter().any(|c| c.key == s.field && c.sortable))
            .collect();

        let mut rows: Vec<Value> = rows
            .into_par_iter()
            .filter(|row| {
                let found = match &needle {
                    Some(n) => searchable
                        .iter()
                        .any(|key| lookup(row, key).map_or(false, |v| contains_ci(v, n))),
                    None => true,
                };
                found && self.filters.iter().all(|f| f.matches(row))
            })
            .collect();

        if !sort.is_empty() {
            rows.par_sort_by(|a, b| {
                sort.iter()
                    .map(|s| {
                        compare_values(lookup(a, &s.field), lookup(b, &s.field), s.direction)
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        rows
    }
}

/// 解析 `sale.mode` 这类点号路径
pub fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(row, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

fn contains_ci(value: &Value, needle_lower: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle_lower),
        Value::Number(n) => n.to_string().contains(needle_lower),
        _ => false,
    }
}

// 空值始终排在最后, 不受排序方向影响
fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };
    let ord = match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    };
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

pub fn render_cell(value: Option<&Value>, preset: CellPreset) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return String::new();
    };
    match (preset, value) {
        (CellPreset::Currency, Value::Number(n)) => {
            format!("${:.2}", n.as_f64().unwrap_or_default())
        }
        (CellPreset::Percent, Value::Number(n)) => {
            format!("{:.2}%", n.as_f64().unwrap_or_default())
        }
        (CellPreset::Date, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| s.clone()),
        (CellPreset::Boolean, Value::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
        (CellPreset::Badge, Value::String(s)) => s.replace('_', " ").to_uppercase(),
        (_, Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    }
}

/// 导出为 CSV, 首行为列标题
pub fn export_csv(columns: &[Column], rows: &[Value]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.label))?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| render_cell(lookup(row, c.key), c.preset)),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", CellPreset::Text).searchable(),
            Column::new("price", "Price", CellPreset::Currency),
            Column::new("sale.mode", "Sale", CellPreset::Badge),
            Column::new("active", "Active", CellPreset::Boolean),
        ]
    }

    fn rows() -> Vec<Value> {
        vec![
            json!({ "id": 1, "name": "banana", "price": 2.0, "sale": { "mode": "unit" }, "active": true }),
            json!({ "id": 2, "name": "Apple", "price": 3.5, "sale": { "mode": "bulk" }, "active": false }),
            json!({ "id": 3, "name": "cherry", "price": null, "sale": { "mode": "bulk" }, "active": true }),
        ]
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn sorts_strings_case_insensitively() {
        let query = TableQuery {
            sort: SortSpec::parse_list("name"),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&columns(), rows())), vec![2, 1, 3]);
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let asc = TableQuery {
            sort: SortSpec::parse_list("price"),
            ..Default::default()
        };
        assert_eq!(ids(&asc.apply(&columns(), rows())), vec![1, 2, 3]);
        let desc = TableQuery {
            sort: SortSpec::parse_list("-price"),
            ..Default::default()
        };
        assert_eq!(ids(&desc.apply(&columns(), rows())), vec![2, 1, 3]);
    }

    #[test]
    fn multi_key_sort_breaks_ties() {
        let query = TableQuery {
            sort: SortSpec::parse_list("sale.mode, -name"),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&columns(), rows())), vec![3, 2, 1]);
    }

    #[test]
    fn unknown_sort_column_is_ignored() {
        let query = TableQuery {
            sort: SortSpec::parse_list("password"),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&columns(), rows())), vec![1, 2, 3]);
    }

    #[test]
    fn search_and_filters_combine() {
        let query = TableQuery {
            search: Some("RR".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&columns(), rows())), vec![3]);

        let query = TableQuery {
            filters: vec![
                ColumnFilter::Equals {
                    field: "sale.mode".to_string(),
                    value: json!("bulk"),
                },
                ColumnFilter::Range {
                    field: "price".to_string(),
                    min: Some(3.0),
                    max: None,
                },
            ],
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&columns(), rows())), vec![2]);
    }

    #[test]
    fn renders_presets() {
        assert_eq!(render_cell(Some(&json!(3.5)), CellPreset::Currency), "$3.50");
        assert_eq!(render_cell(Some(&json!(15)), CellPreset::Percent), "15.00%");
        assert_eq!(render_cell(Some(&json!(false)), CellPreset::Boolean), "No");
        assert_eq!(render_cell(Some(&json!("access_request")), CellPreset::Badge), "ACCESS REQUEST");
        assert_eq!(
            render_cell(Some(&json!("2026-03-01T10:00:00Z")), CellPreset::Date),
            "2026-03-01"
        );
        assert_eq!(render_cell(None, CellPreset::Text), "");
    }

    #[test]
    fn exports_csv_with_header() {
        let csv = export_csv(&columns(), &rows()[..2]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Price,Sale,Active");
        assert_eq!(lines[1], "banana,$2.00,UNIT,Yes");
        assert_eq!(lines[2], "Apple,$3.50,BULK,No");
    }
}
