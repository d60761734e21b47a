//! Monetary helpers shared by the journal engine, documents and reports

use bigdecimal::BigDecimal;

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Tolerance for balance checks and settlement (0.01)
pub fn tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Threshold below which an amount is treated as absent on a statement (0.001)
pub fn epsilon() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(1000)
}

pub fn is_zero(amount: &BigDecimal) -> bool {
    *amount == zero()
}

/// `|amount| <= 0.01`
pub fn within_tolerance(amount: &BigDecimal) -> bool {
    amount.abs() <= tolerance()
}

/// `|amount| > 0.001`
pub fn is_material(amount: &BigDecimal) -> bool {
    amount.abs() > epsilon()
}

/// Round to cents
pub fn round(amount: &BigDecimal) -> BigDecimal {
    amount.round(2)
}

/// Positive part of an amount
pub fn positive_part(amount: &BigDecimal) -> BigDecimal {
    if *amount > zero() {
        amount.clone()
    } else {
        zero()
    }
}

/// `amount * percent / 100`, rounded to cents
pub fn percent_of(amount: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    round(&(amount * percent / BigDecimal::from(100)))
}
