use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::MortgageError;
use crate::types::{Money, Percent, Rate};
use crate::MortgageResult;

const MONTHS_PER_YEAR: u32 = 12;

/// Longest loan term the engine will schedule.
pub const MAX_TERM_YEARS: u32 = 50;

/// Level monthly payment for a fixed-rate amortising loan.
///
/// `M = r·P / (1 - (1+r)^-n)`, degrading to `P / n` when the periodic rate
/// is zero.
pub fn monthly_payment(rate: Rate, periods: u32, principal: Money) -> MortgageResult<Money> {
    validate_periods(periods)?;
    validate_rate(rate)?;

    if rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let annuity_factor = annuity_factor(rate, periods)?;
    if annuity_factor.is_zero() {
        return Err(MortgageError::DivisionByZero {
            context: "monthly payment annuity factor".into(),
        });
    }

    Ok(principal / annuity_factor)
}

/// Loan amount supported by a given level payment. Algebraic inverse of
/// [`monthly_payment`]: `L = M·(1-(1+r)^-n)/r`, or `M·n` at a zero rate.
pub fn principal_from_payment(payment: Money, rate: Rate, periods: u32) -> MortgageResult<Money> {
    validate_periods(periods)?;
    validate_rate(rate)?;

    if rate.is_zero() {
        return Ok(payment * Decimal::from(periods));
    }

    Ok(payment * annuity_factor(rate, periods)?)
}

/// Present value of 1 per period: `(1 - (1+r)^-n) / r`.
fn annuity_factor(rate: Rate, periods: u32) -> MortgageResult<Decimal> {
    let growth = (Decimal::ONE + rate)
        .checked_powu(u64::from(periods))
        .ok_or_else(|| MortgageError::InvalidInput {
            field: "periods".into(),
            reason: format!("(1 + {rate})^{periods} overflows decimal range"),
        })?;

    if growth.is_zero() {
        return Err(MortgageError::DivisionByZero {
            context: "compounding factor".into(),
        });
    }

    Ok((Decimal::ONE - Decimal::ONE / growth) / rate)
}

fn validate_periods(periods: u32) -> MortgageResult<()> {
    if periods == 0 {
        return Err(MortgageError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    Ok(())
}

fn validate_rate(rate: Rate) -> MortgageResult<()> {
    if rate < Decimal::ZERO {
        return Err(MortgageError::InvalidInput {
            field: "rate".into(),
            reason: "Periodic rate cannot be negative".into(),
        });
    }
    Ok(())
}

/// Division that yields zero instead of faulting on a zero denominator.
///
/// Callers are still responsible for rejecting inputs where a zero
/// denominator is meaningless (zero income, zero price).
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

pub fn clamp(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    value.max(min).min(max)
}

/// Annual percent (6.5) to monthly decimal rate (0.0054166...).
pub fn monthly_rate(annual_rate: Percent) -> Rate {
    annual_rate / dec!(100) / Decimal::from(MONTHS_PER_YEAR)
}

/// Years to monthly periods. Terms outside 1..=[`MAX_TERM_YEARS`] are rejected.
pub fn term_months(term_years: u32) -> MortgageResult<u32> {
    if term_years == 0 || term_years > MAX_TERM_YEARS {
        return Err(MortgageError::InvalidInput {
            field: "term_years".into(),
            reason: format!("Term must be between 1 and {MAX_TERM_YEARS} years"),
        });
    }
    term_years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| MortgageError::InvalidInput {
            field: "term_years".into(),
            reason: format!("{term_years} years overflows the period count"),
        })
}

/// Monthly share of an annual percentage charged on `base`
/// (property tax on price, PMI on loan amount).
pub fn monthly_charge(base: Money, annual_pct: Percent) -> Money {
    base * annual_pct / dec!(100) / Decimal::from(MONTHS_PER_YEAR)
}

/// Format an amount as US currency, e.g. `$1,234,567.89`.
pub fn to_currency(amount: Money) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Format a percent value (36.0 → `36.00%`).
pub fn to_percent(value: Percent) -> String {
    format!("{:.2}%", value.round_dp(2))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
