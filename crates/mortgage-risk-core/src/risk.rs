//! Heuristic borrower risk score.
//!
//! A weighted blend of back-end DTI (50%), LTV (30%) and credit band (20%),
//! scaled to 0–100 and bucketed into four labels with fixed guidance text.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MortgageError;
use crate::formulas::clamp;
use crate::types::Rate;

const DTI_WEIGHT: Decimal = dec!(0.5);
const LTV_WEIGHT: Decimal = dec!(0.3);
const CREDIT_WEIGHT: Decimal = dec!(0.2);

/// Back-end DTI at which the DTI component saturates.
const DTI_SATURATION: Rate = dec!(0.5);
/// LTV at which the LTV component saturates.
const LTV_SATURATION: Rate = dec!(1.0);

/// Weight applied to labels outside the known bands by the lenient lookup.
const UNKNOWN_BAND_WEIGHT: Decimal = dec!(0.5);

const HIGH_LTV_GUIDANCE_THRESHOLD: Rate = dec!(0.8);
const HIGH_DTI_GUIDANCE_THRESHOLD: Rate = dec!(0.36);

/// Credit score bands, labelled the way borrowers select them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CreditBand {
    /// 760+
    Excellent,
    /// 720-759
    VeryGood,
    /// 680-719
    Good,
    /// 640-679
    Fair,
    /// Under 640
    Poor,
}

impl CreditBand {
    pub const ALL: [CreditBand; 5] = [
        CreditBand::Excellent,
        CreditBand::VeryGood,
        CreditBand::Good,
        CreditBand::Fair,
        CreditBand::Poor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CreditBand::Excellent => "760+",
            CreditBand::VeryGood => "720-759",
            CreditBand::Good => "680-719",
            CreditBand::Fair => "640-679",
            CreditBand::Poor => "Under 640",
        }
    }

    /// Risk contribution of the band in [0, 1]; lower scores carry more risk.
    pub fn risk_weight(self) -> Decimal {
        match self {
            CreditBand::Excellent => dec!(0.1),
            CreditBand::VeryGood => dec!(0.3),
            CreditBand::Good => dec!(0.5),
            CreditBand::Fair => dec!(0.7),
            CreditBand::Poor => dec!(1.0),
        }
    }

    /// Lenient lookup: unrecognised labels fall back to mid-risk (0.5).
    pub fn weight_or_default(label: &str) -> Decimal {
        label
            .parse::<CreditBand>()
            .map(CreditBand::risk_weight)
            .unwrap_or(UNKNOWN_BAND_WEIGHT)
    }
}

impl fmt::Display for CreditBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CreditBand {
    type Err = MortgageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CreditBand::ALL
            .into_iter()
            .find(|band| band.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| MortgageError::InvalidInput {
                field: "credit_band".into(),
                reason: format!(
                    "Unknown credit band '{trimmed}'; expected one of 760+, 720-759, 680-719, 640-679, Under 640"
                ),
            })
    }
}

impl TryFrom<String> for CreditBand {
    type Error = MortgageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CreditBand> for String {
    fn from(band: CreditBand) -> Self {
        band.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLabel {
    pub fn from_score(score: Decimal) -> Self {
        if score < dec!(25) {
            RiskLabel::Low
        } else if score < dec!(50) {
            RiskLabel::Moderate
        } else if score < dec!(75) {
            RiskLabel::High
        } else {
            RiskLabel::VeryHigh
        }
    }

    /// Badge colour used by presentation layers.
    pub fn display_color(self) -> &'static str {
        match self {
            RiskLabel::Low => "#28a745",
            RiskLabel::Moderate => "#ffc107",
            RiskLabel::High => "#fd7e14",
            RiskLabel::VeryHigh => "#dc3545",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RiskLabel::Low => "Low",
            RiskLabel::Moderate => "Moderate",
            RiskLabel::High => "High",
            RiskLabel::VeryHigh => "Very High",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Weighted score in [0, 100].
    pub score: Decimal,
    pub label: RiskLabel,
    pub guidance: String,
}

/// Weighted 0–100 risk score.
///
/// DTI and LTV components scale linearly and saturate at 50% DTI and 100% LTV.
pub fn risk_score(back_end_dti: Rate, ltv: Rate, credit_band: CreditBand) -> Decimal {
    let dti_risk = (back_end_dti / DTI_SATURATION).min(Decimal::ONE);
    let ltv_risk = (ltv / LTV_SATURATION).min(Decimal::ONE);
    let credit_risk = credit_band.risk_weight();

    let blended = dti_risk * DTI_WEIGHT + ltv_risk * LTV_WEIGHT + credit_risk * CREDIT_WEIGHT;
    clamp(blended * dec!(100), Decimal::ZERO, dec!(100))
}

/// Advisory text for a label. Moderate splits on LTV, High on back-end DTI.
pub fn risk_guidance(label: RiskLabel, ltv: Rate, back_end_dti: Rate) -> &'static str {
    match label {
        RiskLabel::Low => "Good financial position for homeownership",
        RiskLabel::Moderate if ltv > HIGH_LTV_GUIDANCE_THRESHOLD => {
            "Consider increasing down payment to reduce PMI and LTV"
        }
        RiskLabel::Moderate => "Monitor debt levels and consider building emergency fund",
        RiskLabel::High if back_end_dti > HIGH_DTI_GUIDANCE_THRESHOLD => {
            "Consider reducing debt or increasing income before buying"
        }
        RiskLabel::High => "Consider a smaller home price or larger down payment",
        RiskLabel::VeryHigh => "High risk - strongly consider improving financial position first",
    }
}

pub fn assess_risk(back_end_dti: Rate, ltv: Rate, credit_band: CreditBand) -> RiskAssessment {
    let score = risk_score(back_end_dti, ltv, credit_band);
    let label = RiskLabel::from_score(score);
    RiskAssessment {
        score,
        label,
        guidance: risk_guidance(label, ltv, back_end_dti).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_best_case_score() {
        // Only the credit component contributes: 0.1 × 0.2 × 100 = 2
        assert_eq!(
            risk_score(Decimal::ZERO, Decimal::ZERO, CreditBand::Excellent),
            dec!(2)
        );
    }

    #[test]
    fn test_worst_case_score_saturates() {
        assert_eq!(risk_score(dec!(1.0), dec!(1.0), CreditBand::Poor), dec!(100));
        assert_eq!(risk_score(dec!(3.0), dec!(2.5), CreditBand::Poor), dec!(100));
    }

    #[test]
    fn test_reference_borrower_score() {
        // 0.72 × 50 + 0.8 × 30 + 0.3 × 20 = 36 + 24 + 6 = 66
        let score = risk_score(dec!(0.36), dec!(0.8), CreditBand::VeryGood);
        assert_eq!(score, dec!(66));
        assert_eq!(RiskLabel::from_score(score), RiskLabel::High);
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(RiskLabel::from_score(dec!(24.99)), RiskLabel::Low);
        assert_eq!(RiskLabel::from_score(dec!(25)), RiskLabel::Moderate);
        assert_eq!(RiskLabel::from_score(dec!(49.99)), RiskLabel::Moderate);
        assert_eq!(RiskLabel::from_score(dec!(50)), RiskLabel::High);
        assert_eq!(RiskLabel::from_score(dec!(75)), RiskLabel::VeryHigh);
    }

    #[test]
    fn test_guidance_branches() {
        assert_eq!(
            risk_guidance(RiskLabel::Moderate, dec!(0.85), dec!(0.2)),
            "Consider increasing down payment to reduce PMI and LTV"
        );
        assert_eq!(
            risk_guidance(RiskLabel::Moderate, dec!(0.8), dec!(0.2)),
            "Monitor debt levels and consider building emergency fund"
        );
        assert_eq!(
            risk_guidance(RiskLabel::High, dec!(0.5), dec!(0.40)),
            "Consider reducing debt or increasing income before buying"
        );
        assert_eq!(
            risk_guidance(RiskLabel::High, dec!(0.5), dec!(0.36)),
            "Consider a smaller home price or larger down payment"
        );
    }

    #[test]
    fn test_credit_band_parsing() {
        assert_eq!("760+".parse::<CreditBand>().unwrap(), CreditBand::Excellent);
        assert_eq!("under 640".parse::<CreditBand>().unwrap(), CreditBand::Poor);
        assert!("800+".parse::<CreditBand>().is_err());
    }

    #[test]
    fn test_lenient_weight_fallback() {
        assert_eq!(CreditBand::weight_or_default("680-719"), dec!(0.5));
        assert_eq!(CreditBand::weight_or_default("720-759"), dec!(0.3));
        assert_eq!(CreditBand::weight_or_default("no score"), dec!(0.5));
    }

    #[test]
    fn test_credit_band_serde_uses_labels() {
        let json = serde_json::to_string(&CreditBand::Fair).unwrap();
        assert_eq!(json, "\"640-679\"");
        let band: CreditBand = serde_json::from_str("\"Under 640\"").unwrap();
        assert_eq!(band, CreditBand::Poor);
        assert!(serde_json::from_str::<CreditBand>("\"excellent\"").is_err());
    }

    #[test]
    fn test_assess_risk_bundle() {
        let assessment = assess_risk(dec!(0.10), dec!(0.5), CreditBand::Excellent);
        // 0.2 × 50 + 0.5 × 30 + 0.1 × 20 = 10 + 15 + 2 = 27
        assert_eq!(assessment.score, dec!(27));
        assert_eq!(assessment.label, RiskLabel::Moderate);
        assert_eq!(
            assessment.guidance,
            "Monitor debt levels and consider building emergency fund"
        );
    }
}
