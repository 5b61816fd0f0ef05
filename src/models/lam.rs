//! LAM - lease right-of-use asset amortization.
//!
//! Daily amortization scaled by actual usage, interest accrual on the
//! remaining carrying amount, and a market revaluation of which only the
//! downward part (impairment) is recognized. Upward revaluation of a
//! right-of-use asset is not permitted under IFRS 16.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{calc_sensitivity, div, round_to, SensitivityMode};

pub const REVALUATION_NOTE: &str =
    "Upward revaluation of right-of-use assets is not recognized (IFRS 16); only impairment is booked.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LamTriggers {
    pub t_impairment: bool,
    pub t_upward_ignored: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LamOutput {
    pub lease_days: f64,
    pub base_daily_amortization: f64,
    pub usage_adj_factor: f64,
    pub days_used: f64,
    pub amortization_this_period: f64,
    pub carrying_amount_after_amort: f64,
    pub interest_expense: f64,
    pub sensitivity_factor: f64,
    pub revaluation_candidate: f64,
    pub impairment_loss: f64,
    pub unrecognized_revaluation_gain: f64,
    pub carrying_amount_end: f64,
    pub triggers: LamTriggers,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> LamOutput {
    let options = input.options();
    let step = options.round_step();

    let lease_years = input
        .opt_number(&["leaseTermYears"])
        .or_else(|| input.opt_number(&["leaseTermDays"]).map(|d| d / 365.0))
        .unwrap_or(1.0);
    let lease_days = (lease_years * 365.0).round().max(1.0);

    let rou = input.number(
        &[
            "rightOfUseAsset",
            "rouAsset",
            "asset",
            "carryingAmountBegin",
            "acquisitionCost",
        ],
        0.0,
    );
    let base_daily = div(rou, lease_days, 0.0);

    let usage_adj_factor = input.opt_number(&["usePatternAdj"]).unwrap_or_else(|| {
        match input.opt_number(&["totalUsageHours"]) {
            Some(total) => {
                let baseline = input.number(&["baselineUsageHours"], 1.0).max(1.0);
                total / baseline
            }
            None => 1.0,
        }
    });
    let days_used = input
        .opt_number(&["daysUsedThisPeriod", "currentPeriodDays"])
        .unwrap_or(lease_days)
        .max(0.0);

    let amortization = base_daily * days_used * usage_adj_factor;
    let after_amort = rou - amortization;

    let rate = input.frac(&["interestRate", "annualRate", "discountRate"], 0.0);
    let interest = after_amort * rate;

    let r = input.frac(&["marketChangeR"], 0.0);
    let beta = input.frac(&["beta"], 0.0);
    let sensitivity = calc_sensitivity(r, beta, lease_years, SensitivityMode::Decrement);
    let candidate = after_amort * sensitivity;
    let impairment = (after_amort - candidate).max(0.0);
    let unrecognized_gain = (candidate - after_amort).max(0.0);

    let carrying_end = after_amort - impairment + interest;

    let debug = options.debug().then(|| {
        Node::object()
            .with("rou", rou)
            .with("leaseYears", lease_years)
            .with("rate", rate)
            .with("r", r)
            .with("beta", beta)
    });

    LamOutput {
        lease_days,
        base_daily_amortization: round_to(base_daily, step),
        usage_adj_factor: round_to(usage_adj_factor, step),
        days_used,
        amortization_this_period: round_to(amortization, step),
        carrying_amount_after_amort: round_to(after_amort, step),
        interest_expense: round_to(interest, step),
        sensitivity_factor: round_to(sensitivity, step),
        revaluation_candidate: round_to(candidate, step),
        impairment_loss: round_to(impairment, step),
        unrecognized_revaluation_gain: round_to(unrecognized_gain, step),
        carrying_amount_end: round_to(carrying_end, step),
        triggers: LamTriggers {
            t_impairment: impairment > 0.0,
            t_upward_ignored: unrecognized_gain > 0.0,
        },
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<LamOutput> for Node {
    fn from(out: LamOutput) -> Self {
        let mut node = Node::object()
            .with("leaseDays", out.lease_days)
            .with("baseDailyAmortization", out.base_daily_amortization)
            .with("usageAdjFactor", out.usage_adj_factor)
            .with("daysUsed", out.days_used)
            .with("amortizationThisPeriod", out.amortization_this_period)
            .with("carryingAmountAfterAmort", out.carrying_amount_after_amort)
            .with("interestExpense", out.interest_expense)
            .with("sensitivityFactor", out.sensitivity_factor)
            .with("revaluationCandidate", out.revaluation_candidate)
            .with("impairmentLoss", out.impairment_loss)
            .with("unrecognizedRevaluationGain", out.unrecognized_revaluation_gain)
            .with("carryingAmountEnd", out.carrying_amount_end)
            .with(
                "triggers",
                Node::object()
                    .with("tImpairment", out.triggers.t_impairment)
                    .with("tUpwardIgnored", out.triggers.t_upward_ignored),
            )
            .with("revaluationNote", REVALUATION_NOTE);
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_amortization_and_interest() {
        let input = ModelInput::new(json!({
            "rightOfUseAsset": 365_000,
            "leaseTermYears": 1,
            "daysUsedThisPeriod": 30,
            "interestRate": 0.05
        }));
        let out = calculate(&input);
        assert_eq!(out.lease_days, 365.0);
        assert_relative_eq!(out.base_daily_amortization, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(out.amortization_this_period, 30_000.0, epsilon = 1e-6);
        assert_relative_eq!(out.carrying_amount_after_amort, 335_000.0, epsilon = 1e-6);
        assert_relative_eq!(out.interest_expense, 16_750.0, epsilon = 1e-6);
        assert_relative_eq!(out.carrying_amount_end, 351_750.0, epsilon = 1e-6);
        assert!(!out.triggers.t_impairment);
    }

    #[test]
    fn test_usage_hours_scale_amortization() {
        let input = ModelInput::new(json!({
            "rouAsset": 3650,
            "leaseTermDays": 365,
            "daysUsedThisPeriod": 10,
            "totalUsageHours": 150,
            "baselineUsageHours": 100
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.usage_adj_factor, 1.5, epsilon = 1e-9);
        assert_relative_eq!(out.amortization_this_period, 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_upward_move_is_not_recognized() {
        let input = ModelInput::new(json!({
            "rightOfUseAsset": 1000, "leaseTermYears": 2, "daysUsedThisPeriod": 0,
            "marketChangeR": 0.2, "beta": 0.8
        }));
        let out = calculate(&input);
        assert!(out.triggers.t_upward_ignored);
        assert_eq!(out.impairment_loss, 0.0);
        assert_relative_eq!(out.carrying_amount_end, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_downward_move_books_impairment() {
        let input = ModelInput::new(json!({
            "rightOfUseAsset": 1000, "leaseTermYears": 1, "daysUsedThisPeriod": 0,
            "marketChangeR": -0.1, "beta": 1
        }));
        let out = calculate(&input);
        let expected = 1000.0 - 1000.0 * (-0.1f64).exp();
        assert!(out.triggers.t_impairment);
        assert_relative_eq!(out.impairment_loss, expected, epsilon = 1e-5);
        assert_relative_eq!(out.carrying_amount_end, 1000.0 - expected, epsilon = 1e-5);
    }

    #[test]
    fn test_negative_days_used_is_floored() {
        let out = calculate(&ModelInput::new(json!({
            "rightOfUseAsset": 3650,
            "leaseTermYears": 1,
            "daysUsedThisPeriod": -30
        })));
        assert_eq!(out.days_used, 0.0);
        assert_eq!(out.amortization_this_period, 0.0);
        assert_relative_eq!(out.carrying_amount_after_amort, 3650.0, epsilon = 1e-9);
    }
}
