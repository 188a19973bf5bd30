use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use mortgage_risk_core::amortization::{self, AmortizationInput, AmortizationRow};
use mortgage_risk_core::formulas;

use crate::input;
use crate::output;

/// Arguments for the monthly payment calculation
#[derive(Args)]
pub struct PaymentArgs {
    /// Annual interest rate in percent (6.5 = 6.5%)
    #[arg(long)]
    pub rate: Decimal,

    /// Loan term in years
    #[arg(long)]
    pub years: u32,

    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,
}

/// Arguments for amortization schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan amount
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years (15, 20 or 30)
    #[arg(long)]
    pub years: Option<u32>,
}

#[derive(Serialize)]
struct PaymentSummary {
    monthly_payment: Decimal,
    periods: u32,
    total_paid: Decimal,
    total_interest: Decimal,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let periods = formulas::term_months(args.years)?;
    let monthly_payment =
        formulas::monthly_payment(formulas::monthly_rate(args.rate), periods, args.principal)?;
    let total_paid = monthly_payment * Decimal::from(periods);

    let summary = PaymentSummary {
        monthly_payment: monthly_payment.round_dp(2),
        periods,
        total_paid: total_paid.round_dp(2),
        total_interest: (total_paid - args.principal).round_dp(2),
    };
    Ok(serde_json::json!({ "result": summary }))
}

fn schedule_input(args: &ScheduleArgs) -> Result<AmortizationInput, Box<dyn std::error::Error>> {
    if let Some(request) = input::read_request(args.input.as_deref())? {
        return Ok(request);
    }
    Ok(AmortizationInput {
        loan_amount: args
            .loan_amount
            .ok_or("--loan-amount is required (or provide --input)")?,
        annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
        term_years: args.years.ok_or("--years is required (or provide --input)")?,
    })
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = schedule_input(&args)?;
    let result = amortization::generate_amortization(&request)?;
    Ok(serde_json::to_value(result)?)
}

/// Write the schedule straight to stdout using the export columns.
pub fn export_schedule_csv(args: &ScheduleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = schedule_input(args)?;
    let rows: Vec<AmortizationRow> =
        amortization::build_schedule(request.loan_amount, request.annual_rate, request.term_years)?;
    output::csv_out::print_schedule_csv(&rows)
}
