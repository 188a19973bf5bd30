use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_risk_core::risk::{self, CreditBand};

/// Arguments for a standalone risk assessment
#[derive(Args)]
pub struct RiskArgs {
    /// Back-end debt-to-income ratio as a fraction (0.36 = 36%)
    #[arg(long)]
    pub back_end_dti: Decimal,

    /// Loan-to-value ratio as a fraction (0.8 = 80%)
    #[arg(long)]
    pub ltv: Decimal,

    /// Credit band: "760+", "720-759", "680-719", "640-679" or "Under 640"
    #[arg(long)]
    pub credit_band: String,
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let band: CreditBand = args.credit_band.parse()?;
    let assessment = risk::assess_risk(args.back_end_dti, args.ltv, band);
    Ok(serde_json::json!({
        "result": {
            "risk_score": assessment.score.round_dp(2),
            "risk_label": assessment.label,
            "risk_color": assessment.label.display_color(),
            "guidance": assessment.guidance,
            "credit_band": band,
        }
    }))
}
