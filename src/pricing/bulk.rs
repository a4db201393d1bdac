use super::calculator::{margin_from_price, price_from_margin};
use super::units::{Unit, UnitRatio, ALL_UNITS};
use super::PricingError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 字段编辑状态: 标记哪个字段是当前的数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditMode {
    #[default]
    Idle,
    EditingMargin,
    EditingPrice,
}

/// 非基础单位的价格条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPriceEntry {
    pub unit: Unit,
    pub margin_percent: Option<f64>,
    pub price: Option<f64>,
}

/// 可选单位列表中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitChoice {
    pub unit: Unit,
    pub selected: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
struct TrackedEntry {
    entry: UnitPriceEntry,
    mode: EditMode,
}

/// 单个商品表单会话的批量定价
///
/// 以基础单位价格为准。其他单位各有利润率和价格,
/// 由 [`EditMode`] 决定当前以哪一个为准。
#[derive(Debug, Clone)]
pub struct BulkPricingState {
    base_unit: Unit,
    base_price: f64,
    entries: IndexMap<Unit, TrackedEntry>,
}

impl BulkPricingState {
    pub fn new(base_unit: Unit, base_price: f64) -> Result<Self, PricingError> {
        check_base_price(base_price)?;
        Ok(Self {
            base_unit,
            base_price,
            entries: IndexMap::new(),
        })
    }

    /// 从已保存的条目重建会话, 全部处于 `Idle`
    pub fn restore(
        base_unit: Unit,
        base_price: f64,
        entries: Vec<UnitPriceEntry>,
    ) -> Result<Self, PricingError> {
        let mut state = Self::new(base_unit, base_price)?;
        for entry in entries {
            if entry.unit == base_unit {
                return Err(PricingError::BaseUnitSelected(entry.unit));
            }
            state.entries.insert(
                entry.unit,
                TrackedEntry {
                    entry,
                    mode: EditMode::Idle,
                },
            );
        }
        Ok(state)
    }

    pub fn base_unit(&self) -> Unit {
        self.base_unit
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn entry(&self, unit: Unit) -> Option<&UnitPriceEntry> {
        self.entries.get(&unit).map(|t| &t.entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &UnitPriceEntry> {
        self.entries.values().map(|t| &t.entry)
    }

    pub fn to_entries(&self) -> Vec<UnitPriceEntry> {
        self.entries().cloned().collect()
    }

    pub fn mode(&self, unit: Unit) -> EditMode {
        self.entries
            .get(&unit)
            .map(|t| t.mode)
            .unwrap_or_default()
    }

    /// 可选单位列表, 基础单位只读
    pub fn available_units(&self) -> Vec<UnitChoice> {
        ALL_UNITS
            .iter()
            .map(|&unit| UnitChoice {
                unit,
                selected: self.entries.contains_key(&unit),
                read_only: unit == self.base_unit,
            })
            .collect()
    }

    pub fn add_unit(&mut self, unit: Unit) -> Result<(), PricingError> {
        if unit == self.base_unit {
            return Err(PricingError::BaseUnitSelected(unit));
        }
        self.entries.entry(unit).or_insert_with(|| TrackedEntry {
            entry: UnitPriceEntry {
                unit,
                margin_percent: None,
                price: None,
            },
            mode: EditMode::Idle,
        });
        Ok(())
    }

    pub fn remove_unit(&mut self, unit: Unit) -> Option<UnitPriceEntry> {
        self.entries.shift_remove(&unit).map(|t| t.entry)
    }

    pub fn focus_margin(&mut self, unit: Unit) -> Result<(), PricingError> {
        self.tracked_mut(unit)?.mode = EditMode::EditingMargin;
        Ok(())
    }

    /// 写入利润率并推导价格; 该单位正在编辑价格时不推导
    pub fn set_margin(&mut self, unit: Unit, margin: Option<f64>) -> Result<(), PricingError> {
        let ratio = self.ratio_to(unit);
        let base_price = self.base_price;
        let tracked = self.tracked_mut(unit)?;
        tracked.entry.margin_percent = margin;
        if tracked.mode == EditMode::EditingPrice {
            return Ok(());
        }
        if let Some(m) = margin {
            tracked.entry.price = Some(price_from_margin(base_price, ratio, m));
        }
        Ok(())
    }

    pub fn blur_margin(&mut self, unit: Unit) -> Result<(), PricingError> {
        let tracked = self.tracked_mut(unit)?;
        if tracked.mode == EditMode::EditingMargin {
            tracked.mode = EditMode::Idle;
        }
        Ok(())
    }

    pub fn focus_price(&mut self, unit: Unit) -> Result<(), PricingError> {
        self.tracked_mut(unit)?.mode = EditMode::EditingPrice;
        Ok(())
    }

    /// 输入中只写价格, 不触碰利润率
    pub fn set_price(&mut self, unit: Unit, price: Option<f64>) -> Result<(), PricingError> {
        self.tracked_mut(unit)?.entry.price = price;
        Ok(())
    }

    /// 离开价格输入框: 由输入的价格推导利润率
    pub fn blur_price(&mut self, unit: Unit) -> Result<(), PricingError> {
        let ratio = self.ratio_to(unit);
        let base_price = self.base_price;
        let tracked = self.tracked_mut(unit)?;
        if tracked.mode != EditMode::EditingPrice {
            return Ok(());
        }
        tracked.entry.margin_percent = tracked
            .entry
            .price
            .and_then(|p| margin_from_price(base_price, ratio, p));
        tracked.mode = EditMode::Idle;
        Ok(())
    }

    pub fn set_base_price(&mut self, base_price: f64) -> Result<(), PricingError> {
        check_base_price(base_price)?;
        self.base_price = base_price;
        self.reprice();
        Ok(())
    }

    /// 切换基础单位, 新基础单位对应的附加条目被移除
    pub fn set_base_unit(&mut self, unit: Unit) {
        if unit == self.base_unit {
            return;
        }
        if self.entries.shift_remove(&unit).is_some() {
            tracing::debug!("Dropped bulk entry {} now used as base unit", unit);
        }
        self.base_unit = unit;
        self.reprice();
    }

    /// 清空单个条目
    ///
    /// 正在输入价格时只清空利润率, 保留已输入的价格
    pub fn clear(&mut self, unit: Unit) -> Result<(), PricingError> {
        let tracked = self.tracked_mut(unit)?;
        tracked.entry.margin_percent = None;
        if tracked.mode == EditMode::EditingPrice {
            tracing::debug!("Clearing {} during price edit keeps the typed price", unit);
        } else {
            tracked.entry.price = None;
        }
        Ok(())
    }

    fn reprice(&mut self) {
        let base_unit = self.base_unit;
        let base_price = self.base_price;
        for (unit, tracked) in self.entries.iter_mut() {
            if tracked.mode == EditMode::EditingPrice {
                continue;
            }
            if let Some(m) = tracked.entry.margin_percent {
                let ratio = UnitRatio {
                    target: *unit,
                    base: base_unit,
                }
                .value();
                tracked.entry.price = Some(price_from_margin(base_price, ratio, m));
            }
        }
    }

    fn ratio_to(&self, unit: Unit) -> f64 {
        UnitRatio {
            target: unit,
            base: self.base_unit,
        }
        .value()
    }

    fn tracked_mut(&mut self, unit: Unit) -> Result<&mut TrackedEntry, PricingError> {
        self.entries
            .get_mut(&unit)
            .ok_or(PricingError::UnknownEntry(unit))
    }
}

fn check_base_price(base_price: f64) -> Result<(), PricingError> {
    if base_price.is_finite() && base_price >= 0.0 {
        Ok(())
    } else {
        Err(PricingError::InvalidBasePrice(base_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ounce_session() -> BulkPricingState {
        let mut state = BulkPricingState::new(Unit::Ounce, 10.0).unwrap();
        state.add_unit(Unit::Gram).unwrap();
        state
    }

    #[test]
    fn base_unit_cannot_be_added_as_target() {
        let mut state = ounce_session();
        assert_eq!(
            state.add_unit(Unit::Ounce),
            Err(PricingError::BaseUnitSelected(Unit::Ounce))
        );
        let choices = state.available_units();
        let ounce = choices.iter().find(|c| c.unit == Unit::Ounce).unwrap();
        assert!(ounce.read_only);
        let gram = choices.iter().find(|c| c.unit == Unit::Gram).unwrap();
        assert!(gram.selected && !gram.read_only);
    }

    #[test]
    fn margin_edit_derives_price() {
        let mut state = ounce_session();
        state.focus_margin(Unit::Gram).unwrap();
        state.set_margin(Unit::Gram, Some(0.0)).unwrap();
        assert_eq!(state.entry(Unit::Gram).unwrap().price, Some(0.35));
        state.blur_margin(Unit::Gram).unwrap();
        assert_eq!(state.mode(Unit::Gram), EditMode::Idle);
    }

    #[test]
    fn price_edit_derives_margin_on_blur_only() {
        let mut state = ounce_session();
        state.set_margin(Unit::Gram, Some(0.0)).unwrap();

        state.focus_price(Unit::Gram).unwrap();
        state.set_price(Unit::Gram, Some(0.5)).unwrap();
        // 输入过程中利润率保持不变
        assert_eq!(state.entry(Unit::Gram).unwrap().margin_percent, Some(0.0));

        state.blur_price(Unit::Gram).unwrap();
        let margin = state.entry(Unit::Gram).unwrap().margin_percent.unwrap();
        let expected = (0.5 / (10.0 / 28.3495) - 1.0) * 100.0;
        assert!((margin - expected).abs() < 1e-9);
        assert!((margin - 41.75).abs() < 0.01);
        assert_eq!(state.entry(Unit::Gram).unwrap().price, Some(0.5));
        assert_eq!(state.mode(Unit::Gram), EditMode::Idle);
    }

    #[test]
    fn margin_write_during_price_edit_does_not_touch_price() {
        let mut state = ounce_session();
        state.focus_price(Unit::Gram).unwrap();
        state.set_price(Unit::Gram, Some(1.25)).unwrap();
        state.set_margin(Unit::Gram, Some(10.0)).unwrap();
        assert_eq!(state.entry(Unit::Gram).unwrap().price, Some(1.25));
    }

    #[test]
    fn base_price_change_reprices_entries_with_margin() {
        let mut state = BulkPricingState::new(Unit::Gram, 1.0).unwrap();
        state.add_unit(Unit::Ounce).unwrap();
        state.add_unit(Unit::Pound).unwrap();
        state.set_margin(Unit::Ounce, Some(10.0)).unwrap();

        state.set_base_price(2.0).unwrap();
        assert_eq!(
            state.entry(Unit::Ounce).unwrap().price,
            Some(price_from_margin(2.0, 28.3495, 10.0))
        );
        // 无利润率的条目保持原样
        assert_eq!(state.entry(Unit::Pound).unwrap().price, None);
    }

    #[test]
    fn base_price_change_skips_entry_being_priced() {
        let mut state = BulkPricingState::new(Unit::Gram, 1.0).unwrap();
        state.add_unit(Unit::Ounce).unwrap();
        state.set_margin(Unit::Ounce, Some(0.0)).unwrap();
        state.focus_price(Unit::Ounce).unwrap();
        state.set_price(Unit::Ounce, Some(99.0)).unwrap();

        state.set_base_price(5.0).unwrap();
        assert_eq!(state.entry(Unit::Ounce).unwrap().price, Some(99.0));
    }

    #[test]
    fn base_unit_change_drops_matching_entry_and_reprices() {
        let mut state = BulkPricingState::new(Unit::Gram, 1.0).unwrap();
        state.add_unit(Unit::Ounce).unwrap();
        state.add_unit(Unit::Pound).unwrap();
        state.set_margin(Unit::Pound, Some(0.0)).unwrap();

        state.set_base_unit(Unit::Ounce);
        assert_eq!(state.base_unit(), Unit::Ounce);
        assert!(state.entry(Unit::Ounce).is_none());
        let expected = price_from_margin(1.0, 453.592 / 28.3495, 0.0);
        assert_eq!(state.entry(Unit::Pound).unwrap().price, Some(expected));
    }

    #[test]
    fn clear_resets_both_fields_when_idle() {
        let mut state = ounce_session();
        state.set_margin(Unit::Gram, Some(5.0)).unwrap();
        state.clear(Unit::Gram).unwrap();
        let entry = state.entry(Unit::Gram).unwrap();
        assert_eq!(entry.margin_percent, None);
        assert_eq!(entry.price, None);
    }

    #[test]
    fn clear_during_price_edit_keeps_typed_price() {
        let mut state = ounce_session();
        state.set_margin(Unit::Gram, Some(5.0)).unwrap();
        state.focus_price(Unit::Gram).unwrap();
        state.set_price(Unit::Gram, Some(0.4)).unwrap();
        state.clear(Unit::Gram).unwrap();
        let entry = state.entry(Unit::Gram).unwrap();
        assert_eq!(entry.margin_percent, None);
        assert_eq!(entry.price, Some(0.4));
    }

    #[test]
    fn zero_base_price_leaves_margin_underivable() {
        let mut state = BulkPricingState::new(Unit::Gram, 0.0).unwrap();
        state.add_unit(Unit::Pound).unwrap();
        state.focus_price(Unit::Pound).unwrap();
        state.set_price(Unit::Pound, Some(3.0)).unwrap();
        state.blur_price(Unit::Pound).unwrap();
        assert_eq!(state.entry(Unit::Pound).unwrap().margin_percent, None);
    }

    #[test]
    fn negative_base_price_is_rejected() {
        assert_eq!(
            BulkPricingState::new(Unit::Gram, -1.0).unwrap_err(),
            PricingError::InvalidBasePrice(-1.0)
        );
    }

    #[test]
    fn unknown_entry_is_reported() {
        let mut state = ounce_session();
        assert_eq!(
            state.focus_price(Unit::Pound),
            Err(PricingError::UnknownEntry(Unit::Pound))
        );
    }
}
