//! Display helpers for lira amounts and percentages. Nothing in `core` calls these.

const CURRENCY_SYMBOL: &str = "₺";
const UNDEFINED: &str = "—";

fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

/// Whole lira with `.` grouping, e.g. `₺1.234.567`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return UNDEFINED.to_string();
    }
    let rounded = amount.abs().round() as u64;
    let sign = if amount < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{sign}{CURRENCY_SYMBOL}{}", group_thousands(rounded))
}

/// Percent sign first, as the Turkish locale writes it: `%12.3`.
pub fn format_percentage(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return UNDEFINED.to_string();
    }
    format!("%{value:.decimals$}")
}

/// Short axis label: `1.2M`, `450K`, or the plain value.
pub fn format_compact(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.0}K", value / 1_000.0)
    } else {
        format!("{value}")
    }
}
