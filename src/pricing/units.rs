use super::PricingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 散装销售重量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "gr")]
    Gram,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
}

pub const ALL_UNITS: [Unit; 3] = [Unit::Gram, Unit::Ounce, Unit::Pound];

impl Unit {
    pub fn key(self) -> &'static str {
        match self {
            Unit::Gram => "gr",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Gram => "Gram",
            Unit::Ounce => "Ounce",
            Unit::Pound => "Pound",
        }
    }

    pub fn grams(self) -> f64 {
        match self {
            Unit::Gram => 1.0,
            Unit::Ounce => 28.3495,
            Unit::Pound => 453.592,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Unit {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_UNITS
            .iter()
            .copied()
            .find(|u| u.key() == s)
            .ok_or_else(|| PricingError::UnsupportedUnit(s.to_string()))
    }
}

/// 单位对应的克数
pub fn grams_of(unit_key: &str) -> Result<f64, PricingError> {
    Ok(unit_key.parse::<Unit>()?.grams())
}

/// 每克 `base` 对应的 `target` 克数
pub fn ratio(target_key: &str, base_key: &str) -> Result<f64, PricingError> {
    Ok(grams_of(target_key)? / grams_of(base_key)?)
}

/// 基础单位到目标单位的换算系数
///
/// 使用具名字段 `UnitRatio { target, base }`, 方向不会因参数顺序写反。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRatio {
    pub target: Unit,
    pub base: Unit,
}

impl UnitRatio {
    pub fn value(self) -> f64 {
        self.target.grams() / self.base.grams()
    }
}
