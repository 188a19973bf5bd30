//! What-if curves around a solved scenario.
//!
//! Both sweeps are five points centred on the current value at ±step and
//! ±2×step. They reuse the base scenario's tax, insurance and HOA and call the
//! payment formulas directly; no schedule is built.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::affordability::{AffordabilityResult, LoanInputs, PMI_DOWN_PAYMENT_THRESHOLD};
use crate::error::MortgageError;
use crate::formulas::{
    clamp, monthly_charge, monthly_payment, monthly_rate, principal_from_payment, term_months,
};
use crate::types::{Money, Percent};
use crate::MortgageResult;

const STEP_MULTIPLIERS: [i64; 5] = [-2, -1, 0, 1, 2];
const MAX_SWEEP_DOWN_PAYMENT_PCT: Percent = dec!(50);

/// Sweep widths for the what-if curves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySteps {
    /// Rate step in percentage points.
    pub rate_step: Percent,
    /// Down payment step in percentage points of price.
    pub down_payment_step: Percent,
}

impl Default for SensitivitySteps {
    fn default() -> Self {
        Self {
            rate_step: dec!(0.25),
            down_payment_step: dec!(2.0),
        }
    }
}

impl SensitivitySteps {
    pub fn validate(&self) -> MortgageResult<()> {
        if self.rate_step <= Decimal::ZERO {
            return Err(MortgageError::InvalidInput {
                field: "rate_step".into(),
                reason: "Rate step must be positive".into(),
            });
        }
        if self.down_payment_step <= Decimal::ZERO {
            return Err(MortgageError::InvalidInput {
                field: "down_payment_step".into(),
                reason: "Down payment step must be positive".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub annual_rate: Percent,
    pub max_price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownPaymentPoint {
    pub down_payment_pct: Percent,
    pub monthly_payment: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityCurves {
    pub rate: Vec<RatePoint>,
    pub down_payment: Vec<DownPaymentPoint>,
}

pub fn sensitivity_curves(
    base: &AffordabilityResult,
    inputs: &LoanInputs,
    target_payment: Money,
    steps: &SensitivitySteps,
) -> MortgageResult<SensitivityCurves> {
    steps.validate()?;
    Ok(SensitivityCurves {
        rate: rate_sensitivity(base, inputs, target_payment, steps.rate_step)?,
        down_payment: down_payment_sensitivity(base, inputs, steps.down_payment_step)?,
    })
}

/// Affordable price as the rate moves, holding the payment budget fixed.
///
/// The P&I budget is the target payment less the base scenario's tax,
/// insurance and HOA. Swept rates below zero are evaluated at zero.
pub fn rate_sensitivity(
    base: &AffordabilityResult,
    inputs: &LoanInputs,
    target_payment: Money,
    rate_step: Percent,
) -> MortgageResult<Vec<RatePoint>> {
    let periods = term_months(inputs.term_years)?;
    let pi_budget = (target_payment - base.payment_breakdown.escrow_and_fees()).max(Decimal::ZERO);

    STEP_MULTIPLIERS
        .iter()
        .map(|&k| {
            let annual_rate = (inputs.annual_rate + rate_step * Decimal::from(k)).max(Decimal::ZERO);
            let loan = principal_from_payment(pi_budget, monthly_rate(annual_rate), periods)?;
            Ok(RatePoint {
                annual_rate,
                max_price: loan + inputs.down_payment,
            })
        })
        .collect()
}

/// Monthly payment at the base price as the down payment share moves.
/// Swept shares are clamped to [0, 50]%.
pub fn down_payment_sensitivity(
    base: &AffordabilityResult,
    inputs: &LoanInputs,
    down_payment_step: Percent,
) -> MortgageResult<Vec<DownPaymentPoint>> {
    let price = base.home_price;
    let rate = monthly_rate(inputs.annual_rate);
    let periods = term_months(inputs.term_years)?;
    let fixed_costs = base.payment_breakdown.escrow_and_fees();
    let base_pct = base.down_payment_pct();
    let pmi_threshold_pct = PMI_DOWN_PAYMENT_THRESHOLD * dec!(100);

    STEP_MULTIPLIERS
        .iter()
        .map(|&k| {
            let pct = clamp(
                base_pct + down_payment_step * Decimal::from(k),
                Decimal::ZERO,
                MAX_SWEEP_DOWN_PAYMENT_PCT,
            );
            let loan = price - price * pct / dec!(100);
            let principal_interest = monthly_payment(rate, periods, loan)?;
            let pmi = if pct < pmi_threshold_pct {
                monthly_charge(loan, inputs.pmi_rate)
            } else {
                Decimal::ZERO
            };
            Ok(DownPaymentPoint {
                down_payment_pct: pct,
                monthly_payment: principal_interest + fixed_costs + pmi,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordability::price_affordability;
    use crate::risk::CreditBand;
    use rust_decimal_macros::dec;

    fn inputs() -> LoanInputs {
        LoanInputs {
            home_price: Some(dec!(400_000)),
            down_payment: dec!(80_000),
            annual_rate: dec!(6.5),
            term_years: 30,
            property_tax_rate: dec!(1.2),
            annual_insurance: dec!(1_200),
            monthly_hoa: Decimal::ZERO,
            pmi_rate: dec!(0.5),
            annual_income: dec!(120_000),
            existing_monthly_debt: dec!(500),
            credit_band: CreditBand::VeryGood,
            closing_cost_pct: dec!(3),
        }
    }

    #[test]
    fn test_rate_curve_centred_and_decreasing() {
        let inputs = inputs();
        let base = price_affordability(&inputs).unwrap();
        let curve = rate_sensitivity(&base, &inputs, dec!(2800), dec!(0.25)).unwrap();
        assert_eq!(curve.len(), 5);
        assert_eq!(curve[2].annual_rate, dec!(6.5));
        assert_eq!(curve[0].annual_rate, dec!(6.0));
        assert_eq!(curve[4].annual_rate, dec!(7.0));
        for pair in curve.windows(2) {
            assert!(pair[1].max_price < pair[0].max_price);
        }
    }

    #[test]
    fn test_rate_curve_clamps_negative_rates() {
        let mut inputs = inputs();
        inputs.annual_rate = dec!(0.25);
        let base = price_affordability(&inputs).unwrap();
        let curve = rate_sensitivity(&base, &inputs, dec!(2800), dec!(0.25)).unwrap();
        assert_eq!(curve[0].annual_rate, Decimal::ZERO);
        assert_eq!(curve[1].annual_rate, Decimal::ZERO);
        // Zero rate: budget × 360 + down payment
        assert_eq!(curve[0].max_price, dec!(2300) * dec!(360) + dec!(80_000));
    }

    #[test]
    fn test_rate_curve_budget_below_fixed_costs() {
        let inputs = inputs();
        let base = price_affordability(&inputs).unwrap();
        let curve = rate_sensitivity(&base, &inputs, dec!(100), dec!(0.25)).unwrap();
        assert!(curve.iter().all(|p| p.max_price == dec!(80_000)));
    }

    #[test]
    fn test_down_payment_curve_pmi_step() {
        let inputs = inputs();
        let base = price_affordability(&inputs).unwrap();
        let curve = down_payment_sensitivity(&base, &inputs, dec!(2)).unwrap();
        let pcts: Vec<Decimal> = curve.iter().map(|p| p.down_payment_pct).collect();
        assert_eq!(pcts, vec![dec!(16), dec!(18), dec!(20), dec!(22), dec!(24)]);
        // Centre point reproduces the base payment (20% down, no PMI)
        assert!((curve[2].monthly_payment - base.monthly_payment()).abs() < dec!(0.000001));
        for pair in curve.windows(2) {
            assert!(pair[1].monthly_payment < pair[0].monthly_payment);
        }
    }

    #[test]
    fn test_down_payment_curve_clamped() {
        let mut inputs = inputs();
        inputs.down_payment = dec!(4_000);
        let base = price_affordability(&inputs).unwrap();
        let curve = down_payment_sensitivity(&base, &inputs, dec!(2)).unwrap();
        assert_eq!(curve[0].down_payment_pct, Decimal::ZERO);
        assert_eq!(curve[1].down_payment_pct, Decimal::ZERO);
        assert_eq!(curve[2].down_payment_pct, dec!(1));
    }

    #[test]
    fn test_steps_must_be_positive() {
        let steps = SensitivitySteps {
            rate_step: Decimal::ZERO,
            ..SensitivitySteps::default()
        };
        assert!(steps.validate().is_err());
    }
}
