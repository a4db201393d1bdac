pub mod bulk;
pub mod calculator;
pub mod units;

pub use bulk::{BulkPricingState, EditMode, UnitChoice, UnitPriceEntry};
pub use calculator::{display_margin, margin_from_price, price_from_margin, round2};
pub use units::{grams_of, ratio, Unit, UnitRatio, ALL_UNITS};

use thiserror::Error;

/// 批量定价错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),

    #[error("Unit {0} is not part of the bulk pricing table")]
    UnknownEntry(Unit),

    #[error("Unit {0} is the base unit and cannot be priced against itself")]
    BaseUnitSelected(Unit),

    #[error("Invalid base price: {0}")]
    InvalidBasePrice(f64),
}
