use chrono::Utc;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use mortgage_risk_core::affordability::{DtiLimits, LoanInputs, SolverConfig};
use mortgage_risk_core::report;
use mortgage_risk_core::scenario::{self, CalculationMode, ScenarioRequest};
use mortgage_risk_core::sensitivity::SensitivitySteps;
use mortgage_risk_core::session::Session;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Evaluate the given home price
    Priced,
    /// Solve for the highest affordable price
    Max,
}

impl From<ModeArg> for CalculationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Priced => CalculationMode::Priced,
            ModeArg::Max => CalculationMode::MaxAffordability,
        }
    }
}

/// Arguments for an affordability scenario
#[derive(Args)]
pub struct AffordArgs {
    /// Path to JSON or YAML scenario request (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Calculation mode
    #[arg(long, value_enum, default_value = "priced")]
    pub mode: ModeArg,

    /// Home price (required in priced mode)
    #[arg(long)]
    pub home_price: Option<Decimal>,

    /// Down payment amount
    #[arg(long)]
    pub down_payment: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years (15, 20 or 30)
    #[arg(long, default_value_t = 30)]
    pub years: u32,

    /// Annual property tax as percent of price
    #[arg(long, default_value = "1.2")]
    pub property_tax_rate: Decimal,

    /// Annual home insurance
    #[arg(long, default_value = "1200")]
    pub insurance: Decimal,

    /// Monthly HOA fees
    #[arg(long, default_value = "0")]
    pub hoa: Decimal,

    /// Annual PMI as percent of loan amount
    #[arg(long, default_value = "0.5")]
    pub pmi_rate: Decimal,

    /// Gross annual income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Existing monthly debt payments
    #[arg(long, default_value = "0")]
    pub monthly_debt: Decimal,

    /// Credit band: "760+", "720-759", "680-719", "640-679" or "Under 640"
    #[arg(long, default_value = "720-759")]
    pub credit_band: String,

    /// Closing costs as percent of price
    #[arg(long, default_value = "3")]
    pub closing_cost_pct: Decimal,

    /// Include the full amortization schedule
    #[arg(long)]
    pub schedule: bool,

    /// Fail instead of returning an estimate when the price solver does not converge
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the report document
#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub scenario: AffordArgs,
}

/// Arguments for comparing two saved scenarios
#[derive(Args)]
pub struct CompareArgs {
    /// Scenario request saved first
    #[arg(long)]
    pub first: String,

    /// Scenario request saved second
    #[arg(long)]
    pub second: String,
}

fn scenario_request(args: &AffordArgs) -> Result<ScenarioRequest, Box<dyn std::error::Error>> {
    let mut request = match input::read_request::<ScenarioRequest>(args.input.as_deref())? {
        Some(request) => {
            debug!(source = args.input.as_deref().unwrap_or("stdin"), "scenario request loaded");
            request
        }
        None => ScenarioRequest {
            inputs: LoanInputs {
                home_price: args.home_price,
                down_payment: args
                    .down_payment
                    .ok_or("--down-payment is required (or provide --input)")?,
                annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
                term_years: args.years,
                property_tax_rate: args.property_tax_rate,
                annual_insurance: args.insurance,
                monthly_hoa: args.hoa,
                pmi_rate: args.pmi_rate,
                annual_income: args.income.ok_or("--income is required (or provide --input)")?,
                existing_monthly_debt: args.monthly_debt,
                credit_band: args.credit_band.parse()?,
                closing_cost_pct: args.closing_cost_pct,
            },
            mode: args.mode.into(),
            limits: DtiLimits::default(),
            solver: SolverConfig::default(),
            sensitivity: SensitivitySteps::default(),
            include_schedule: args.schedule,
        },
    };

    // Switches apply on top of file and stdin requests too
    if args.schedule {
        request.include_schedule = true;
    }
    if args.strict {
        request.solver.strict_convergence = true;
    }
    Ok(request)
}

pub fn run_afford(args: AffordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = scenario_request(&args)?;
    let result = scenario::run_scenario(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = scenario_request(&args.scenario)?;
    let output = scenario::run_scenario(&request)?;
    let document = report::build_report(&output.result, &output.warnings, Utc::now());
    Ok(serde_json::json!({
        "result": document,
        "methodology": output.methodology,
        "warnings": output.warnings,
    }))
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut session = Session::new();
    for path in [&args.first, &args.second] {
        let request: ScenarioRequest = input::file::read_document(path)?;
        session.run(&request)?;
        session.save_scenario(path.as_str())?;
    }

    let comparison = session
        .compare()
        .ok_or("Two saved scenarios are required for a comparison")?;
    Ok(serde_json::json!({ "result": comparison }))
}
