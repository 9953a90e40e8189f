//! Uzbekistan tax formulas for 2025.
//!
//! Pure functions over user-supplied figures. Negative inputs are not
//! rejected; the output is signed accordingly.

use serde::Serialize;

pub const PIT_STANDARD_RATE: f64 = 0.12;
pub const PIT_STUDENT_RATE: f64 = 0.01;
pub const VAT_RATE: f64 = 0.12;

/// CIT rates by taxpayer category, matched case-insensitively.
pub const CIT_RATES: &[(&str, f64)] = &[
    ("standard", 0.15),
    ("bank", 0.20),
    ("mobile", 0.20),
    ("ecommerce", 0.10),
    ("knitwear", 0.01),
];

pub const CIT_STANDARD_RATE: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitResult {
    pub gross_income: f64,
    pub tax_rate: String,
    pub tax_amount: f64,
    pub net_income: f64,
    #[serde(rename = "type")]
    pub tax_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitResult {
    pub taxable_profit: f64,
    pub category: String,
    pub tax_rate: String,
    pub tax_amount: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VatResult {
    pub total_amount: f64,
    pub base_amount: f64,
    pub vat_rate: String,
    pub vat_amount: f64,
    pub includes_vat: bool,
}

/// Personal Income Tax. Students pay a 1% preferential rate.
pub fn calculate_pit(income: f64, is_student: bool) -> PitResult {
    let rate = if is_student {
        PIT_STUDENT_RATE
    } else {
        PIT_STANDARD_RATE
    };
    let tax_amount = income * rate;

    PitResult {
        gross_income: income,
        tax_rate: format_rate(rate),
        tax_amount,
        net_income: income - tax_amount,
        tax_type: if is_student {
            "Personal Income Tax (Student)".to_string()
        } else {
            "Personal Income Tax (Standard)".to_string()
        },
    }
}

/// Corporate Income Tax. Unknown categories fall back to the standard
/// rate rather than failing; this is a policy choice, not an error.
pub fn calculate_cit(profit: f64, category: &str) -> CitResult {
    let rate = CIT_RATES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, rate)| *rate)
        .unwrap_or(CIT_STANDARD_RATE);
    let tax_amount = profit * rate;

    CitResult {
        taxable_profit: profit,
        category: category.to_string(),
        tax_rate: format_rate(rate),
        tax_amount,
        net_profit: profit - tax_amount,
    }
}

/// Value Added Tax at the flat 12% rate.
///
/// With `includes_vat`, `amount` is the VAT-inclusive total and the base
/// is backed out of it. Otherwise `amount` is the pre-tax base and the
/// total is recomputed as base + VAT, so the returned triple always
/// satisfies `total ≈ base + vat`.
pub fn calculate_vat(amount: f64, includes_vat: bool) -> VatResult {
    let (total_amount, base_amount, vat_amount) = if includes_vat {
        let base = amount / (1.0 + VAT_RATE);
        (amount, base, amount - base)
    } else {
        let vat = amount * VAT_RATE;
        (amount + vat, amount, vat)
    };

    VatResult {
        total_amount,
        base_amount,
        vat_rate: format_rate(VAT_RATE),
        vat_amount,
        includes_vat,
    }
}

/// Render a fractional rate as a percentage string, e.g. `0.12` -> `"12%"`.
fn format_rate(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}%", pct)
    } else {
        format!("{}%", pct)
    }
}
