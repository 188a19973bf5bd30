//! Structured summary document for a computed scenario. Rendering it (HTML,
//! PDF, terminal) is left to the caller.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::affordability::PaymentBreakdown;
use crate::formulas::{to_currency, to_percent};
use crate::risk::RiskLabel;
use crate::scenario::ScenarioOutput;
use crate::types::{Money, Rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub home_price: Money,
    pub loan_amount: Money,
    pub monthly_payment: Money,
    pub back_end_dti: Rate,
    pub ltv: Rate,
    pub risk_label: RiskLabel,
}

/// Display-ready strings for the summary and each payment component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedSummary {
    pub home_price: String,
    pub loan_amount: String,
    pub monthly_payment: String,
    pub back_end_dti: String,
    pub ltv: String,
    pub risk_level: String,
    pub payment_lines: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub payment_breakdown: PaymentBreakdown,
    pub formatted: FormattedSummary,
    pub risk_color: String,
    pub risk_guidance: String,
    pub warnings: Vec<String>,
}

pub fn build_report(
    output: &ScenarioOutput,
    warnings: &[String],
    generated_at: DateTime<Utc>,
) -> MortgageReport {
    let a = &output.affordability;
    let summary = ReportSummary {
        home_price: a.home_price,
        loan_amount: a.loan_amount,
        monthly_payment: a.monthly_payment(),
        back_end_dti: a.back_end_dti,
        ltv: a.ltv,
        risk_label: output.risk.label,
    };

    let payment_lines = a
        .payment_breakdown
        .components()
        .iter()
        .map(|(name, amount)| (name.to_string(), to_currency(*amount)))
        .collect();

    let formatted = FormattedSummary {
        home_price: to_currency(summary.home_price),
        loan_amount: to_currency(summary.loan_amount),
        monthly_payment: to_currency(summary.monthly_payment),
        back_end_dti: to_percent(summary.back_end_dti * dec!(100)),
        ltv: to_percent(summary.ltv * dec!(100)),
        risk_level: summary.risk_label.to_string(),
        payment_lines,
    };

    MortgageReport {
        title: "Mortgage Analysis Report".into(),
        generated_at,
        payment_breakdown: a.payment_breakdown.clone(),
        formatted,
        risk_color: output.risk.label.display_color().into(),
        risk_guidance: output.risk.guidance.clone(),
        warnings: warnings.to_vec(),
        summary,
    }
}
