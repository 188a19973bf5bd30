use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::affordability::{
    price_affordability, solve_max_affordability, target_payment, AffordabilityResult,
    Convergence, DtiLimits, LoanInputs, SolverConfig,
};
use crate::amortization::{build_schedule, AmortizationRow};
use crate::formulas::to_currency;
use crate::risk::{assess_risk, RiskAssessment};
use crate::sensitivity::{sensitivity_curves, SensitivityCurves, SensitivitySteps};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::MortgageResult;

/// Down payment share below which most lenders decline the loan.
const MIN_COMMON_DOWN_PAYMENT_PCT: Percent = dec!(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    /// Evaluate the price in `inputs.home_price`.
    #[default]
    Priced,
    /// Solve for the highest price the DTI limits allow.
    MaxAffordability,
}

/// One request from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub inputs: LoanInputs,
    #[serde(default)]
    pub mode: CalculationMode,
    #[serde(default)]
    pub limits: DtiLimits,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub sensitivity: SensitivitySteps,
    /// Build the full amortization schedule as well.
    #[serde(default)]
    pub include_schedule: bool,
}

/// Everything the presentation layer needs for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub mode: CalculationMode,
    pub affordability: AffordabilityResult,
    pub risk: RiskAssessment,
    pub convergence: Convergence,
    /// Largest housing payment the DTI limits allow.
    pub target_payment: Money,
    pub total_interest: Money,
    pub closing_costs: Money,
    pub down_payment_pct: Percent,
    pub sensitivity: SensitivityCurves,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Arc<Vec<AmortizationRow>>>,
}

/// Run a scenario end to end with a freshly built schedule.
pub fn run_scenario(request: &ScenarioRequest) -> MortgageResult<ComputationOutput<ScenarioOutput>> {
    run_scenario_with(request, |loan, rate, term| {
        build_schedule(loan, rate, term).map(Arc::new)
    })
}

/// Run a scenario, obtaining the schedule (when requested) from `schedule_fn`.
/// Sessions pass a memoising lookup here.
pub fn run_scenario_with<F>(
    request: &ScenarioRequest,
    schedule_fn: F,
) -> MortgageResult<ComputationOutput<ScenarioOutput>>
where
    F: FnOnce(Money, Percent, u32) -> MortgageResult<Arc<Vec<AmortizationRow>>>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let inputs = &request.inputs;

    request.limits.validate()?;
    request.sensitivity.validate()?;

    let (affordability, convergence, target, methodology) = match request.mode {
        CalculationMode::Priced => {
            let result = price_affordability(inputs)?;
            let target = target_payment(inputs, &request.limits);
            (
                result,
                Convergence::Exact,
                target,
                "Priced Affordability Analysis",
            )
        }
        CalculationMode::MaxAffordability => {
            let outcome = solve_max_affordability(inputs, &request.limits, &request.solver)?;
            if outcome.price_floor_applied {
                warnings.push(format!(
                    "Solved price was raised to the floor of {}; the DTI limits do not support a larger loan",
                    to_currency(outcome.result.home_price)
                ));
            }
            (
                outcome.result,
                outcome.convergence,
                outcome.target_payment,
                "Max Affordability (Fixed-Point Price Solver)",
            )
        }
    };

    if let Convergence::Approximate {
        iterations,
        payment_gap,
        backed_off,
    } = &convergence
    {
        let mut message = format!(
            "Price solver did not converge within {iterations} iterations; price is an estimate (payment gap {})",
            to_currency(*payment_gap)
        );
        if *backed_off {
            message.push_str(", reduced to stay within the payment target");
        }
        warnings.push(message);
    }

    let down_payment_pct = affordability.down_payment_pct();
    if down_payment_pct < MIN_COMMON_DOWN_PAYMENT_PCT {
        warnings.push("Many lenders require a minimum 3% down payment".into());
    }
    if affordability.exceeds(&request.limits) {
        warnings.push(
            "DTI exceeds recommended limits. Consider a lower price or higher down payment.".into(),
        );
    }

    let risk = assess_risk(
        affordability.back_end_dti,
        affordability.ltv,
        inputs.credit_band,
    );
    let sensitivity = sensitivity_curves(&affordability, inputs, target, &request.sensitivity)?;

    let schedule = if request.include_schedule {
        Some(schedule_fn(
            affordability.loan_amount,
            inputs.annual_rate,
            inputs.term_years,
        )?)
    } else {
        None
    };

    let output = ScenarioOutput {
        mode: request.mode,
        total_interest: affordability
            .total_interest(inputs.term_years)
            .max(Decimal::ZERO),
        closing_costs: affordability.closing_costs(inputs.closing_cost_pct),
        down_payment_pct,
        affordability,
        risk,
        convergence,
        target_payment: target,
        sensitivity,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, request, warnings, elapsed, output))
}
