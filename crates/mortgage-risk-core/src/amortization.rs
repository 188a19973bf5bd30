//! Level-payment amortization schedules.
//!
//! The schedule walks month by month from the opening balance, splitting the
//! level payment into interest and principal and clamping the balance at zero.
//! Floating residue at the end of the term is tolerated rather than folded into
//! a balloon payment. All math in `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageError;
use crate::formulas::{monthly_payment, monthly_rate, term_months};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::MortgageResult;

/// CSV export column headers, in row order.
pub const SCHEDULE_COLUMNS: [&str; 6] = [
    "Month",
    "Beginning Balance",
    "Interest",
    "Principal",
    "Ending Balance",
    "Cumulative Interest",
];

/// One month of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub beginning_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_balance: Money,
    pub cumulative_interest: Money,
}

impl AmortizationRow {
    /// Row values in [`SCHEDULE_COLUMNS`] order, rounded to cents.
    pub fn to_record(&self) -> [String; 6] {
        [
            self.month.to_string(),
            cents(self.beginning_balance),
            cents(self.interest),
            cents(self.principal),
            cents(self.ending_balance),
            cents(self.cumulative_interest),
        ]
    }
}

fn cents(value: Money) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Loan terms for a standalone schedule request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub loan_amount: Money,
    /// Annual interest rate in percent (6.5 = 6.5%).
    pub annual_rate: Percent,
    pub term_years: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_paid: Money,
    /// Month in which the balance reached zero (or the last scheduled month).
    pub payoff_month: u32,
    pub schedule: Vec<AmortizationRow>,
}

/// Build the month-by-month schedule for a level-payment loan.
///
/// Emits rows until the balance reaches zero or the term runs out, so the
/// result never has more than `term_years × 12` rows.
pub fn build_schedule(
    loan_amount: Money,
    annual_rate: Percent,
    term_years: u32,
) -> MortgageResult<Vec<AmortizationRow>> {
    Ok(level_payment_schedule(loan_amount, annual_rate, term_years)?.1)
}

/// The level payment together with the rows it produces.
fn level_payment_schedule(
    loan_amount: Money,
    annual_rate: Percent,
    term_years: u32,
) -> MortgageResult<(Money, Vec<AmortizationRow>)> {
    validate(loan_amount, annual_rate)?;

    let rate = monthly_rate(annual_rate);
    let total_months = term_months(term_years)?;
    let payment = monthly_payment(rate, total_months, loan_amount)?;

    let mut schedule = Vec::with_capacity(total_months as usize);
    let mut balance = loan_amount;
    let mut cumulative_interest = Decimal::ZERO;

    for month in 1..=total_months {
        let beginning_balance = balance;
        let interest = beginning_balance * rate;
        let principal = payment - interest;
        balance = (beginning_balance - principal).max(Decimal::ZERO);
        cumulative_interest += interest;

        schedule.push(AmortizationRow {
            month,
            beginning_balance,
            interest,
            principal,
            ending_balance: balance,
            cumulative_interest,
        });

        if balance.is_zero() {
            break;
        }
    }

    Ok((payment, schedule))
}

/// Schedule plus lifetime totals, wrapped in the standard envelope.
pub fn generate_amortization(
    input: &AmortizationInput,
) -> MortgageResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (payment, schedule) =
        level_payment_schedule(input.loan_amount, input.annual_rate, input.term_years)?;

    let total_interest = schedule
        .last()
        .map(|row| row.cumulative_interest)
        .unwrap_or_default();
    let payoff_month = schedule.last().map(|row| row.month).unwrap_or_default();

    if let Some(last) = schedule.last() {
        if last.ending_balance >= Decimal::ONE {
            warnings.push(format!(
                "Schedule ends with a residual balance of {}",
                last.ending_balance.round_dp(2)
            ));
        }
    }

    let output = AmortizationOutput {
        monthly_payment: payment,
        total_interest,
        total_paid: input.loan_amount + total_interest,
        payoff_month,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-Payment Amortization Schedule",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate(loan_amount: Money, annual_rate: Percent) -> MortgageResult<()> {
    if loan_amount <= Decimal::ZERO {
        return Err(MortgageError::InvalidInput {
            field: "loan_amount".into(),
            reason: "Loan amount must be positive".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(MortgageError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    Ok(())
}
