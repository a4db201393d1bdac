/// 金额保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 由基础单位价格和利润率 (百分比) 计算目标单位价格
pub fn price_from_margin(base_price: f64, ratio: f64, margin_percent: f64) -> f64 {
    round2(base_price * ratio * (1.0 + margin_percent / 100.0))
}

/// [`price_from_margin`] 的逆运算, 换算后的基础价格为零时返回 `None`
pub fn margin_from_price(base_price: f64, ratio: f64, price: f64) -> Option<f64> {
    let converted = base_price * ratio;
    if converted == 0.0 {
        return None;
    }
    let margin = (price / converted - 1.0) * 100.0;
    margin.is_finite().then_some(margin)
}

/// 显示用: 无法推导的利润率显示为空
pub fn display_margin(margin: Option<f64>) -> String {
    match margin {
        Some(m) if m.is_finite() => format!("{:.2}", m),
        _ => String::new(),
    }
}
