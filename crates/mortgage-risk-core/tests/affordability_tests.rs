use mortgage_risk_core::affordability::{
    self, Convergence, DtiLimits, LoanInputs, SolverConfig,
};
use mortgage_risk_core::amortization;
use mortgage_risk_core::formulas;
use mortgage_risk_core::risk::{self, CreditBand, RiskLabel};
use mortgage_risk_core::scenario::{self, CalculationMode, ScenarioRequest};
use mortgage_risk_core::session::Session;
use mortgage_risk_core::MortgageError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn first_time_buyer() -> LoanInputs {
    LoanInputs {
        home_price: Some(dec!(400_000)),
        down_payment: dec!(80_000),
        annual_rate: dec!(6.5),
        term_years: 30,
        property_tax_rate: dec!(1.2),
        annual_insurance: dec!(1_200),
        monthly_hoa: Decimal::ZERO,
        pmi_rate: dec!(0.5),
        annual_income: dec!(80_000),
        existing_monthly_debt: dec!(500),
        credit_band: CreditBand::VeryGood,
        closing_cost_pct: dec!(3),
    }
}

fn request(inputs: LoanInputs, mode: CalculationMode) -> ScenarioRequest {
    ScenarioRequest {
        inputs,
        mode,
        limits: DtiLimits::default(),
        solver: SolverConfig::default(),
        sensitivity: Default::default(),
        include_schedule: true,
    }
}

// ===========================================================================
// Formula library
// ===========================================================================

#[test]
fn test_payment_reference_value() {
    let payment = formulas::monthly_payment(dec!(0.065) / dec!(12), 360, dec!(320_000)).unwrap();
    assert!((payment - dec!(2021.84)).abs() < dec!(1.0));
}

#[test]
fn test_payment_and_principal_are_inverse() {
    let rate = formulas::monthly_rate(dec!(5.125));
    let loan = formulas::principal_from_payment(dec!(1_750), rate, 180).unwrap();
    let payment = formulas::monthly_payment(rate, 180, loan).unwrap();
    assert!((payment - dec!(1_750)).abs() < dec!(0.000001));
}

// ===========================================================================
// Priced mode
// ===========================================================================

#[test]
fn test_priced_mode_twenty_percent_down() {
    let result = affordability::price_affordability(&first_time_buyer()).unwrap();
    assert_eq!(result.loan_amount, dec!(320_000));
    assert_eq!(result.ltv, dec!(0.80));
    assert_eq!(result.payment_breakdown.pmi, Decimal::ZERO);
}

#[test]
fn test_priced_mode_never_returns_negative_loan() {
    for down in [dec!(400_000), dec!(450_000)] {
        let mut inputs = first_time_buyer();
        inputs.down_payment = down;
        match affordability::price_affordability(&inputs) {
            Err(MortgageError::InvalidInput { field, .. }) => assert_eq!(field, "down_payment"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}

#[test]
fn test_priced_mode_components_non_negative() {
    let mut inputs = first_time_buyer();
    inputs.down_payment = dec!(20_000);
    inputs.monthly_hoa = dec!(250);
    let b = affordability::price_affordability(&inputs)
        .unwrap()
        .payment_breakdown;
    for (_, amount) in b.components() {
        assert!(amount >= Decimal::ZERO);
    }
    assert_eq!(b.total, b.principal_interest + b.tax + b.insurance + b.hoa + b.pmi);
    // 380,000 × 0.5% / 12
    assert!((b.pmi - dec!(158.33)).abs() < dec!(0.01));
}

// ===========================================================================
// Max affordability
// ===========================================================================

#[test]
fn test_max_affordability_respects_target() {
    let mut inputs = first_time_buyer();
    inputs.home_price = None;
    inputs.down_payment = dec!(60_000);
    let outcome = affordability::solve_max_affordability(
        &inputs,
        &DtiLimits::default(),
        &SolverConfig::default(),
    )
    .unwrap();

    assert!(matches!(outcome.convergence, Convergence::Converged { iterations } if iterations <= 10));
    assert!(outcome.result.monthly_payment() <= outcome.target_payment + dec!(10));
    assert_eq!(
        outcome.result.loan_amount,
        outcome.result.home_price - inputs.down_payment
    );
}

#[test]
fn test_max_affordability_higher_income_buys_more() {
    let mut inputs = first_time_buyer();
    inputs.home_price = None;
    let limits = DtiLimits::default();
    let config = SolverConfig::default();

    let base = affordability::solve_max_affordability(&inputs, &limits, &config).unwrap();
    inputs.annual_income = dec!(120_000);
    let richer = affordability::solve_max_affordability(&inputs, &limits, &config).unwrap();

    assert!(richer.result.home_price > base.result.home_price);
}

#[test]
fn test_max_affordability_looser_limits_buy_more() {
    let mut inputs = first_time_buyer();
    inputs.home_price = None;
    let config = SolverConfig::default();
    let tight = affordability::solve_max_affordability(&inputs, &DtiLimits::default(), &config)
        .unwrap();
    let loose = affordability::solve_max_affordability(
        &inputs,
        &DtiLimits {
            max_front_dti: dec!(0.31),
            max_back_dti: dec!(0.43),
        },
        &config,
    )
    .unwrap();
    assert!(loose.result.home_price > tight.result.home_price);
}

// ===========================================================================
// Risk
// ===========================================================================

#[test]
fn test_risk_reference_points() {
    assert_eq!(
        risk::risk_score(Decimal::ZERO, Decimal::ZERO, CreditBand::Excellent),
        dec!(2)
    );
    assert_eq!(
        risk::risk_score(dec!(1.0), dec!(1.0), CreditBand::Poor),
        dec!(100)
    );
}

#[test]
fn test_risk_label_for_comfortable_borrower() {
    let assessment = risk::assess_risk(dec!(0.05), dec!(0.3), CreditBand::Excellent);
    // (0.1 × 0.5 + 0.3 × 0.3 + 0.1 × 0.2) × 100
    assert_eq!(assessment.score, dec!(16));
    assert_eq!(assessment.label, RiskLabel::Low);
}

// ===========================================================================
// Orchestration
// ===========================================================================

#[test]
fn test_scenario_schedule_matches_engine() {
    let out = scenario::run_scenario(&request(first_time_buyer(), CalculationMode::Priced)).unwrap();
    let schedule = out.result.schedule.unwrap();
    let direct = amortization::build_schedule(dec!(320_000), dec!(6.5), 30).unwrap();
    assert_eq!(*schedule, direct);
}

#[test]
fn test_session_round_trip_two_modes() {
    let mut session = Session::new();

    let priced = request(first_time_buyer(), CalculationMode::Priced);
    session.run(&priced).unwrap();
    session.save_scenario("priced").unwrap();

    let mut solve_inputs = first_time_buyer();
    solve_inputs.home_price = None;
    session
        .run(&request(solve_inputs, CalculationMode::MaxAffordability))
        .unwrap();
    session.save_scenario("max").unwrap();

    let comparison = session.compare().unwrap();
    assert_eq!(comparison.previous.mode, CalculationMode::Priced);
    assert_eq!(comparison.current.mode, CalculationMode::MaxAffordability);
    // The DTI-constrained price sits below the over-stretched 400k purchase
    assert!(comparison.home_price_change < Decimal::ZERO);
    assert!(comparison.back_end_dti_change < Decimal::ZERO);
}
