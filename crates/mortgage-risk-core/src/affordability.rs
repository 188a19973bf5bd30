//! Affordability: payment composition, DTI/LTV, and the max-price solver.
//!
//! Two entry points share one evaluation path ([`evaluate_at_price`]):
//! - priced mode takes the home price as given;
//! - max-affordability mode searches for the largest price whose total
//!   monthly payment fits the tighter of the front-end and back-end DTI
//!   allowances.
//!
//! Property tax scales with price and PMI switches on below 20% down, so the
//! max price has no closed form. The solver rescales a seed price by
//! `target / payment` for a bounded number of iterations and stops early once
//! the payment lands within a fixed dollar tolerance of the target. Results
//! that exhaust the bound are flagged as approximate rather than passed off as
//! exact.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MortgageError;
use crate::formulas::{monthly_charge, monthly_payment, monthly_rate, safe_divide, term_months};
use crate::risk::CreditBand;
use crate::types::{Money, Percent, Rate};
use crate::MortgageResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Loan terms offered, in years.
pub const SUPPORTED_TERMS: [u32; 3] = [15, 20, 30];

/// Highest annual rate accepted, in percent.
pub const MAX_ANNUAL_RATE: Percent = dec!(20);

/// PMI is charged while the down payment is below this share of price.
pub const PMI_DOWN_PAYMENT_THRESHOLD: Rate = dec!(0.20);

/// Bisection steps used when pulling an overshooting estimate back under the target.
const BACKOFF_STEPS: u32 = 64;

const MONTHS_PER_YEAR: Decimal = dec!(12);

fn default_closing_cost_pct() -> Percent {
    dec!(3.0)
}

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Borrower and property assumptions for one calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInputs {
    /// Purchase price. Required in priced mode, ignored when solving for the max price.
    #[serde(default)]
    pub home_price: Option<Money>,
    pub down_payment: Money,
    /// Annual interest rate in percent (6.5 = 6.5%).
    pub annual_rate: Percent,
    pub term_years: u32,
    /// Annual property tax as percent of price.
    pub property_tax_rate: Percent,
    pub annual_insurance: Money,
    #[serde(default)]
    pub monthly_hoa: Money,
    /// Annual PMI as percent of loan amount.
    pub pmi_rate: Percent,
    pub annual_income: Money,
    #[serde(default)]
    pub existing_monthly_debt: Money,
    pub credit_band: CreditBand,
    /// Closing costs as percent of price.
    #[serde(default = "default_closing_cost_pct")]
    pub closing_cost_pct: Percent,
}

impl LoanInputs {
    pub fn monthly_income(&self) -> Money {
        self.annual_income / MONTHS_PER_YEAR
    }

    /// Reject inputs that would produce a misleading result.
    pub fn validate(&self) -> MortgageResult<()> {
        if self.annual_income <= Decimal::ZERO {
            return Err(MortgageError::invalid(
                "annual_income",
                "Annual income must be positive",
            ));
        }
        if !SUPPORTED_TERMS.contains(&self.term_years) {
            return Err(MortgageError::invalid(
                "term_years",
                format!(
                    "Term of {} years is not offered; use 15, 20 or 30",
                    self.term_years
                ),
            ));
        }
        if self.annual_rate < Decimal::ZERO || self.annual_rate > MAX_ANNUAL_RATE {
            return Err(MortgageError::invalid(
                "annual_rate",
                format!("Interest rate must be between 0% and {MAX_ANNUAL_RATE}%"),
            ));
        }
        if let Some(price) = self.home_price {
            if price <= Decimal::ZERO {
                return Err(MortgageError::invalid(
                    "home_price",
                    "Home price must be positive",
                ));
            }
        }

        let non_negative = [
            ("down_payment", self.down_payment),
            ("property_tax_rate", self.property_tax_rate),
            ("annual_insurance", self.annual_insurance),
            ("monthly_hoa", self.monthly_hoa),
            ("pmi_rate", self.pmi_rate),
            ("existing_monthly_debt", self.existing_monthly_debt),
            ("closing_cost_pct", self.closing_cost_pct),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(MortgageError::invalid(field, "Value cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Underwriting ceilings on housing payment (front-end) and total debt (back-end).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DtiLimits {
    pub max_front_dti: Rate,
    pub max_back_dti: Rate,
}

impl Default for DtiLimits {
    fn default() -> Self {
        Self {
            max_front_dti: dec!(0.28),
            max_back_dti: dec!(0.36),
        }
    }
}

impl DtiLimits {
    pub fn validate(&self) -> MortgageResult<()> {
        for (field, value) in [
            ("max_front_dti", self.max_front_dti),
            ("max_back_dti", self.max_back_dti),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(MortgageError::invalid(
                    field,
                    "DTI limit must be in (0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// Tunables for the max-affordability solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub seed_price: Money,
    pub max_iterations: u32,
    /// Absolute monthly-payment tolerance for early exit.
    pub tolerance: Money,
    /// The solved price never drops below `down_payment + price_floor_margin`.
    pub price_floor_margin: Money,
    /// Fail with `ConvergenceFailure` instead of returning a flagged estimate.
    pub strict_convergence: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed_price: dec!(400_000),
            max_iterations: 10,
            tolerance: dec!(10),
            price_floor_margin: dec!(1_000),
            strict_convergence: false,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> MortgageResult<()> {
        if self.seed_price <= Decimal::ZERO {
            return Err(MortgageError::invalid("seed_price", "Seed price must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(MortgageError::invalid(
                "max_iterations",
                "At least one iteration is required",
            ));
        }
        if self.tolerance <= Decimal::ZERO {
            return Err(MortgageError::invalid("tolerance", "Tolerance must be positive"));
        }
        if self.price_floor_margin <= Decimal::ZERO {
            return Err(MortgageError::invalid(
                "price_floor_margin",
                "Price floor margin must be positive",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Monthly housing payment by component. `total` is always the component sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub principal_interest: Money,
    pub tax: Money,
    pub insurance: Money,
    pub hoa: Money,
    pub pmi: Money,
    pub total: Money,
}

impl PaymentBreakdown {
    pub fn new(
        principal_interest: Money,
        tax: Money,
        insurance: Money,
        hoa: Money,
        pmi: Money,
    ) -> Self {
        Self {
            principal_interest,
            tax,
            insurance,
            hoa,
            pmi,
            total: principal_interest + tax + insurance + hoa + pmi,
        }
    }

    /// Everything except principal and interest.
    pub fn escrow_and_fees(&self) -> Money {
        self.tax + self.insurance + self.hoa
    }

    /// Named components in display order, for charts and tables.
    pub fn components(&self) -> [(&'static str, Money); 5] {
        [
            ("Principal & Interest", self.principal_interest),
            ("Property Tax", self.tax),
            ("Home Insurance", self.insurance),
            ("HOA Fees", self.hoa),
            ("PMI", self.pmi),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityResult {
    pub home_price: Money,
    pub down_payment: Money,
    pub loan_amount: Money,
    pub payment_breakdown: PaymentBreakdown,
    pub front_end_dti: Rate,
    pub back_end_dti: Rate,
    pub ltv: Rate,
    /// Down payment is below the PMI threshold for this price.
    pub pmi_applied: bool,
}

impl AffordabilityResult {
    pub fn monthly_payment(&self) -> Money {
        self.payment_breakdown.total
    }

    /// Down payment as percent of price.
    pub fn down_payment_pct(&self) -> Percent {
        safe_divide(self.down_payment, self.home_price) * dec!(100)
    }

    /// Interest paid over the full term at the level P&I payment.
    pub fn total_interest(&self, term_years: u32) -> Money {
        self.payment_breakdown.principal_interest * Decimal::from(term_years) * MONTHS_PER_YEAR
            - self.loan_amount
    }

    pub fn closing_costs(&self, closing_cost_pct: Percent) -> Money {
        self.home_price * closing_cost_pct / dec!(100)
    }

    pub fn exceeds(&self, limits: &DtiLimits) -> bool {
        self.front_end_dti > limits.max_front_dti || self.back_end_dti > limits.max_back_dti
    }
}

/// How the reported price was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Convergence {
    /// Price was supplied; nothing was solved.
    Exact,
    /// Payment landed within tolerance of the target.
    Converged { iterations: u32 },
    /// Iteration bound exhausted. `backed_off` is set when an overshooting
    /// estimate was pulled back under the target.
    Approximate {
        iterations: u32,
        payment_gap: Money,
        backed_off: bool,
    },
}

impl Convergence {
    pub fn is_approximate(&self) -> bool {
        matches!(self, Convergence::Approximate { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub result: AffordabilityResult,
    /// Largest housing payment the DTI limits allow.
    pub target_payment: Money,
    pub convergence: Convergence,
    /// The price was raised, or backed off, to `down_payment + price_floor_margin`.
    pub price_floor_applied: bool,
}

// ---------------------------------------------------------------------------
// Shared evaluation
// ---------------------------------------------------------------------------

pub fn pmi_applies(down_payment: Money, home_price: Money) -> bool {
    safe_divide(down_payment, home_price) < PMI_DOWN_PAYMENT_THRESHOLD
}

/// Monthly payment composition at `home_price` with the given down payment.
pub fn payment_breakdown(
    home_price: Money,
    down_payment: Money,
    inputs: &LoanInputs,
) -> MortgageResult<PaymentBreakdown> {
    let loan_amount = home_price - down_payment;
    if loan_amount <= Decimal::ZERO {
        return Err(MortgageError::invalid(
            "down_payment",
            "Down payment must be less than home price",
        ));
    }

    let principal_interest = monthly_payment(
        monthly_rate(inputs.annual_rate),
        term_months(inputs.term_years)?,
        loan_amount,
    )?;
    let tax = monthly_charge(home_price, inputs.property_tax_rate);
    let insurance = inputs.annual_insurance / MONTHS_PER_YEAR;
    let pmi = if pmi_applies(down_payment, home_price) {
        monthly_charge(loan_amount, inputs.pmi_rate)
    } else {
        Decimal::ZERO
    };

    Ok(PaymentBreakdown::new(
        principal_interest,
        tax,
        insurance,
        inputs.monthly_hoa,
        pmi,
    ))
}

/// Full affordability picture at a given price. Both modes end here.
pub fn evaluate_at_price(home_price: Money, inputs: &LoanInputs) -> MortgageResult<AffordabilityResult> {
    if home_price <= Decimal::ZERO {
        return Err(MortgageError::invalid(
            "home_price",
            "Home price must be positive",
        ));
    }

    let payment_breakdown = payment_breakdown(home_price, inputs.down_payment, inputs)?;
    let loan_amount = home_price - inputs.down_payment;
    let monthly_income = inputs.monthly_income();

    Ok(AffordabilityResult {
        home_price,
        down_payment: inputs.down_payment,
        loan_amount,
        front_end_dti: safe_divide(payment_breakdown.total, monthly_income),
        back_end_dti: safe_divide(
            payment_breakdown.total + inputs.existing_monthly_debt,
            monthly_income,
        ),
        ltv: safe_divide(loan_amount, home_price),
        pmi_applied: pmi_applies(inputs.down_payment, home_price),
        payment_breakdown,
    })
}

// ---------------------------------------------------------------------------
// Priced mode
// ---------------------------------------------------------------------------

/// Affordability at the price the borrower named.
pub fn price_affordability(inputs: &LoanInputs) -> MortgageResult<AffordabilityResult> {
    inputs.validate()?;
    let home_price = inputs.home_price.ok_or_else(|| {
        MortgageError::invalid("home_price", "Home price is required in priced mode")
    })?;
    if inputs.down_payment >= home_price {
        return Err(MortgageError::invalid(
            "down_payment",
            "Down payment cannot be greater than or equal to home price",
        ));
    }
    evaluate_at_price(home_price, inputs)
}

// ---------------------------------------------------------------------------
// Max-affordability mode
// ---------------------------------------------------------------------------

/// Largest total housing payment allowed by the DTI limits.
pub fn target_payment(inputs: &LoanInputs, limits: &DtiLimits) -> Money {
    let monthly_income = inputs.monthly_income();
    let front_end_cap = monthly_income * limits.max_front_dti;
    let back_end_cap = monthly_income * limits.max_back_dti - inputs.existing_monthly_debt;
    front_end_cap.min(back_end_cap)
}

/// Solve for the highest price whose payment fits the DTI limits.
pub fn solve_max_affordability(
    inputs: &LoanInputs,
    limits: &DtiLimits,
    config: &SolverConfig,
) -> MortgageResult<SolverOutcome> {
    inputs.validate()?;
    limits.validate()?;
    config.validate()?;

    let target = target_payment(inputs, limits);
    if target <= Decimal::ZERO {
        return Err(MortgageError::FinancialImpossibility(format!(
            "Existing monthly debt of {} leaves no room under the {}% back-end DTI limit",
            inputs.existing_monthly_debt.round_dp(2),
            (limits.max_back_dti * dec!(100)).normalize()
        )));
    }

    let down_payment = inputs.down_payment;
    let floor = down_payment + config.price_floor_margin;

    let floor_payment = payment_breakdown(floor, down_payment, inputs)?.total;
    if floor_payment > target + config.tolerance {
        return Err(MortgageError::FinancialImpossibility(format!(
            "Payment at the minimum price of {} is {}, above the {} the DTI limits allow",
            floor.round_dp(2),
            floor_payment.round_dp(2),
            target.round_dp(2)
        )));
    }

    let mut price = config.seed_price;
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 1..=config.max_iterations {
        iterations = iteration;

        if price <= down_payment {
            price = (down_payment * dec!(2)).max(floor);
            debug!(iteration, price = %price, "seed loan non-positive, reseeding");
            continue;
        }

        let total = payment_breakdown(price, down_payment, inputs)?.total;
        let gap = total - target;
        debug!(
            iteration,
            price = %price.round_dp(2),
            payment = %total.round_dp(2),
            gap = %gap.round_dp(2),
            "affordability solver step"
        );

        if gap.abs() < config.tolerance {
            converged = true;
            break;
        }

        price *= safe_divide(target, total);
    }

    let mut price_floor_applied = price < floor;
    let mut price = price.max(floor);
    let mut result = evaluate_at_price(price, inputs)?;

    let convergence = if converged {
        Convergence::Converged { iterations }
    } else {
        let mut backed_off = false;
        if result.monthly_payment() > target + config.tolerance && !price_floor_applied {
            price = back_off(floor, price, target, inputs)?;
            result = evaluate_at_price(price, inputs)?;
            backed_off = true;
            price_floor_applied |= price == floor;
        }
        let payment_gap = result.monthly_payment() - target;

        warn!(
            iterations,
            price = %price.round_dp(2),
            gap = %payment_gap.round_dp(2),
            backed_off,
            "affordability solver exhausted its iteration bound"
        );

        if config.strict_convergence {
            return Err(MortgageError::ConvergenceFailure {
                function: "max affordability solver".into(),
                iterations,
                last_delta: payment_gap,
            });
        }

        Convergence::Approximate {
            iterations,
            payment_gap,
            backed_off,
        }
    };

    Ok(SolverOutcome {
        result,
        target_payment: target,
        convergence,
        price_floor_applied,
    })
}

/// Bisect between the floor and an overshooting estimate for the highest
/// price whose payment stays at or below the target. Total payment is
/// non-decreasing in price, so the bracket stays valid. If even the floor
/// overshoots (by less than the tolerance), the floor is returned.
fn back_off(
    floor: Money,
    estimate: Money,
    target: Money,
    inputs: &LoanInputs,
) -> MortgageResult<Money> {
    let payment_at = |price: Money| -> MortgageResult<Money> {
        Ok(payment_breakdown(price, inputs.down_payment, inputs)?.total)
    };

    if payment_at(floor)? > target {
        return Ok(floor);
    }

    let mut low = floor;
    let mut high = estimate;
    for _ in 0..BACKOFF_STEPS {
        let mid = (low + high) / dec!(2);
        if payment_at(mid)? <= target {
            low = mid;
        } else {
            high = mid;
        }
        if high - low < dec!(0.01) {
            break;
        }
    }
    Ok(low)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
