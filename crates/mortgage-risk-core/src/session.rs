//! Session context: last computed scenario, saved-scenario history, and the
//! schedule memo.
//!
//! A `Session` is owned by one user interaction loop and mutated through
//! `&mut self`, so there is exactly one writer at a time. Services that share
//! sessions across requests should wrap each one in its own lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::affordability::AffordabilityResult;
use crate::amortization::{build_schedule, AmortizationRow};
use crate::error::MortgageError;
use crate::risk::RiskLabel;
use crate::scenario::{run_scenario_with, CalculationMode, ScenarioOutput, ScenarioRequest};
use crate::types::{ComputationOutput, Money, Percent, Rate};
use crate::MortgageResult;

/// Saved scenarios kept for comparison.
pub const HISTORY_CAPACITY: usize = 2;

/// Distinct schedules memoised per session before the memo is flushed.
const SCHEDULE_CACHE_CAPACITY: usize = 32;

/// Snapshot of a computed scenario taken by an explicit save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScenario {
    pub label: String,
    pub saved_at: DateTime<Utc>,
    pub mode: CalculationMode,
    pub affordability: AffordabilityResult,
    pub risk_score: Decimal,
    pub risk_label: RiskLabel,
}

impl SavedScenario {
    pub fn from_output(label: String, output: &ScenarioOutput, saved_at: DateTime<Utc>) -> Self {
        Self {
            label,
            saved_at,
            mode: output.mode,
            affordability: output.affordability.clone(),
            risk_score: output.risk.score,
            risk_label: output.risk.label,
        }
    }
}

/// FIFO buffer of saved scenarios; the oldest is evicted once full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioHistory {
    entries: VecDeque<SavedScenario>,
}

impl ScenarioHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot, returning the one evicted to make room, if any.
    pub fn push(&mut self, scenario: SavedScenario) -> Option<SavedScenario> {
        let evicted = if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(scenario);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SavedScenario> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&SavedScenario> {
        self.entries.back()
    }

    pub fn previous(&self) -> Option<&SavedScenario> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.get(self.entries.len() - 2)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Side-by-side view of the two most recent saved scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub previous: SavedScenario,
    pub current: SavedScenario,
    pub home_price_change: Money,
    pub monthly_payment_change: Money,
    pub back_end_dti_change: Rate,
    pub ltv_change: Rate,
    pub risk_score_change: Decimal,
}

impl ScenarioComparison {
    pub fn between(previous: &SavedScenario, current: &SavedScenario) -> Self {
        let (p, c) = (&previous.affordability, &current.affordability);
        Self {
            home_price_change: c.home_price - p.home_price,
            monthly_payment_change: c.monthly_payment() - p.monthly_payment(),
            back_end_dti_change: c.back_end_dti - p.back_end_dti,
            ltv_change: c.ltv - p.ltv,
            risk_score_change: current.risk_score - previous.risk_score,
            previous: previous.clone(),
            current: current.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScheduleKey {
    loan_amount: Money,
    annual_rate: Percent,
    term_years: u32,
}

#[derive(Debug, Default)]
pub struct Session {
    history: ScenarioHistory,
    last_output: Option<ScenarioOutput>,
    schedule_cache: HashMap<ScheduleKey, Arc<Vec<AmortizationRow>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a scenario and remember it as the candidate for the next save.
    pub fn run(
        &mut self,
        request: &ScenarioRequest,
    ) -> MortgageResult<ComputationOutput<ScenarioOutput>> {
        let cache = &mut self.schedule_cache;
        let output = run_scenario_with(request, |loan, rate, term| {
            cached_schedule(cache, loan, rate, term)
        })?;
        self.last_output = Some(output.result.clone());
        Ok(output)
    }

    /// Memoised amortization schedule.
    pub fn schedule(
        &mut self,
        loan_amount: Money,
        annual_rate: Percent,
        term_years: u32,
    ) -> MortgageResult<Arc<Vec<AmortizationRow>>> {
        cached_schedule(&mut self.schedule_cache, loan_amount, annual_rate, term_years)
    }

    pub fn last_output(&self) -> Option<&ScenarioOutput> {
        self.last_output.as_ref()
    }

    /// Save the last computed scenario into the history.
    pub fn save_scenario(&mut self, label: impl Into<String>) -> MortgageResult<&SavedScenario> {
        self.save_scenario_at(label, Utc::now())
    }

    pub fn save_scenario_at(
        &mut self,
        label: impl Into<String>,
        saved_at: DateTime<Utc>,
    ) -> MortgageResult<&SavedScenario> {
        let output = self.last_output.as_ref().ok_or_else(|| {
            MortgageError::InsufficientData("No scenario has been computed in this session".into())
        })?;

        let snapshot = SavedScenario::from_output(label.into(), output, saved_at);
        info!(label = %snapshot.label, price = %snapshot.affordability.home_price.round_dp(2), "scenario saved");
        if let Some(evicted) = self.history.push(snapshot) {
            info!(label = %evicted.label, "oldest scenario evicted from history");
        }

        self.history.latest().ok_or_else(|| {
            MortgageError::InsufficientData("Scenario history is empty after save".into())
        })
    }

    pub fn history(&self) -> &ScenarioHistory {
        &self.history
    }

    /// Previous vs. current once two scenarios have been saved.
    pub fn compare(&self) -> Option<ScenarioComparison> {
        let previous = self.history.previous()?;
        let current = self.history.latest()?;
        Some(ScenarioComparison::between(previous, current))
    }

    /// Forget the last computed scenario. Saved history is kept.
    pub fn reset(&mut self) {
        self.last_output = None;
    }

    pub fn cached_schedules(&self) -> usize {
        self.schedule_cache.len()
    }
}

fn cached_schedule(
    cache: &mut HashMap<ScheduleKey, Arc<Vec<AmortizationRow>>>,
    loan_amount: Money,
    annual_rate: Percent,
    term_years: u32,
) -> MortgageResult<Arc<Vec<AmortizationRow>>> {
    let key = ScheduleKey {
        loan_amount,
        annual_rate,
        term_years,
    };
    if let Some(schedule) = cache.get(&key) {
        debug!(loan = %loan_amount, rate = %annual_rate, term_years, "schedule cache hit");
        return Ok(Arc::clone(schedule));
    }

    let schedule = Arc::new(build_schedule(loan_amount, annual_rate, term_years)?);
    if cache.len() >= SCHEDULE_CACHE_CAPACITY {
        cache.clear();
    }
    debug!(loan = %loan_amount, rate = %annual_rate, term_years, "schedule cache miss");
    cache.insert(key, Arc::clone(&schedule));
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordability::{DtiLimits, LoanInputs, SolverConfig};
    use crate::risk::CreditBand;
    use crate::sensitivity::SensitivitySteps;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn request(price: Decimal) -> ScenarioRequest {
        ScenarioRequest {
            inputs: LoanInputs {
                home_price: Some(price),
                down_payment: dec!(80_000),
                annual_rate: dec!(6.5),
                term_years: 30,
                property_tax_rate: dec!(1.2),
                annual_insurance: dec!(1_200),
                monthly_hoa: Decimal::ZERO,
                pmi_rate: dec!(0.5),
                annual_income: dec!(150_000),
                existing_monthly_debt: dec!(500),
                credit_band: CreditBand::Excellent,
                closing_cost_pct: dec!(3),
            },
            mode: CalculationMode::Priced,
            limits: DtiLimits::default(),
            solver: SolverConfig::default(),
            sensitivity: SensitivitySteps::default(),
            include_schedule: true,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_save_requires_computed_scenario() {
        let mut session = Session::new();
        match session.save_scenario("empty") {
            Err(MortgageError::InsufficientData(_)) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut session = Session::new();
        for (i, price) in [dec!(400_000), dec!(450_000), dec!(500_000)]
            .into_iter()
            .enumerate()
        {
            session.run(&request(price)).unwrap();
            session
                .save_scenario_at(format!("s{i}"), at(i as u32))
                .unwrap();
        }

        let labels: Vec<&str> = session.history().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["s1", "s2"]);
        assert_eq!(session.history().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_compare_two_saved() {
        let mut session = Session::new();
        session.run(&request(dec!(400_000))).unwrap();
        session.save_scenario_at("first", at(9)).unwrap();
        assert!(session.compare().is_none());

        session.run(&request(dec!(450_000))).unwrap();
        session.save_scenario_at("second", at(10)).unwrap();

        let comparison = session.compare().unwrap();
        assert_eq!(comparison.previous.label, "first");
        assert_eq!(comparison.current.label, "second");
        assert_eq!(comparison.home_price_change, dec!(50_000));
        assert!(comparison.monthly_payment_change > Decimal::ZERO);
        assert!(comparison.ltv_change > Decimal::ZERO);
    }

    #[test]
    fn test_schedule_memoised() {
        let mut session = Session::new();
        let a = session.schedule(dec!(320_000), dec!(6.5), 30).unwrap();
        let b = session.schedule(dec!(320_000), dec!(6.5), 30).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(session.cached_schedules(), 1);

        let out = session.run(&request(dec!(400_000))).unwrap();
        // Same loan terms as above: served from the memo without a copy
        assert_eq!(session.cached_schedules(), 1);
        assert!(Arc::ptr_eq(out.result.schedule.as_ref().unwrap(), &a));
    }

    #[test]
    fn test_reset_keeps_history() {
        let mut session = Session::new();
        session.run(&request(dec!(400_000))).unwrap();
        session.save_scenario_at("kept", at(8)).unwrap();
        session.reset();
        assert!(session.last_output().is_none());
        assert_eq!(session.history().len(), 1);
        assert!(session.save_scenario("again").is_err());
    }

    #[test]
    fn test_history_push_returns_evicted() {
        let mut session = Session::new();
        session.run(&request(dec!(400_000))).unwrap();
        let snapshot = session.save_scenario_at("a", at(1)).unwrap().clone();

        let mut history = ScenarioHistory::new();
        assert!(history.push(snapshot.clone()).is_none());
        assert!(history.push(snapshot.clone()).is_none());
        assert_eq!(history.push(snapshot.clone()), Some(snapshot));
        assert_eq!(history.len(), 2);
    }
}
