//! CEEM - consumable expense reappraisal.
//!
//! Compares the period's consumption value against the baseline implied by
//! the cumulative daily average, turns the gap into a monthly log return net
//! of last year's rate, and compounds it into a market index.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{div, round_to, safe_log};

const LOG_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct CeemOutput {
    pub daily_avg_usage: f64,
    pub baseline_value: f64,
    pub total_value: f64,
    pub usage_change_pct: f64,
    pub p_beta: f64,
    pub r: f64,
    pub market_index: f64,
    pub reappraised_cost: f64,
    pub t_usage_up30: bool,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> CeemOutput {
    let options = input.options();
    let step = options.round_step();

    let cumulative_usage = input.number(&["cumulativeUsage", "cumulativeUsageQty"], 0.0);
    let cumulative_days = input.number(&["cumulativeDays", "cumulativeUsageDays"], 0.0);
    let period_days = input.number(&["periodDays", "currentDays"], 0.0);
    let unit_cost = input.number(&["unitCost"], 1.0);
    let total_usage = input.number(&["totalUsage", "currentUsageQty"], 0.0);

    let daily_avg = div(cumulative_usage, cumulative_days, 0.0);
    let baseline_value = input
        .opt_number(&["baselineValue"])
        .unwrap_or(daily_avg * period_days * unit_cost);
    let total_value = input
        .opt_number(&["totalValue"])
        .unwrap_or(total_usage * unit_cost);

    let usage_change_pct = div(total_value - baseline_value, baseline_value, 0.0);
    let p_beta = 1.0 + usage_change_pct;

    let prev_year_r = input.frac(&["prevYearR"], 0.0);
    let monthly_prev = (1.0 + prev_year_r).powf(1.0 / 12.0);
    let r = safe_log(div(p_beta, monthly_prev, p_beta), LOG_EPS);

    let beta = input.number(&["beta"], 1.0);
    let years = input.number(&["years", "usefulLifeYears"], 1.0);
    let market_index = (r * years).exp() * beta;
    let reappraised = total_value * market_index;

    let debug = options.debug().then(|| {
        Node::object()
            .with("cumulativeUsage", cumulative_usage)
            .with("cumulativeDays", cumulative_days)
            .with("periodDays", period_days)
            .with("unitCost", unit_cost)
            .with("prevYearR", prev_year_r)
            .with("beta", beta)
            .with("years", years)
    });

    CeemOutput {
        daily_avg_usage: round_to(daily_avg, step),
        baseline_value: round_to(baseline_value, step),
        total_value: round_to(total_value, step),
        usage_change_pct: round_to(usage_change_pct, step),
        p_beta: round_to(p_beta, step),
        r: round_to(r, step),
        market_index: round_to(market_index, step),
        reappraised_cost: round_to(reappraised, step),
        t_usage_up30: usage_change_pct >= 0.30,
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<CeemOutput> for Node {
    fn from(out: CeemOutput) -> Self {
        let mut node = Node::object()
            .with("dailyAvgUsage", out.daily_avg_usage)
            .with("baselineValue", out.baseline_value)
            .with("totalValue", out.total_value)
            .with("usageChangePct", out.usage_change_pct)
            .with("pBeta", out.p_beta)
            .with("r", out.r)
            .with("marketIndex", out.market_index)
            .with("reappraisedCost", out.reappraised_cost)
            .with("triggers", Node::object().with("tUsageUp30", out.t_usage_up30));
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
    fn test_consumption_above_baseline() {
        let input = ModelInput::new(json!({
            "cumulativeUsage": 36_500,
            "cumulativeUsageDays": 365,
            "unitCost": 2.5,
            "periodDays": 30,
            "totalUsage": 3600,
            "prevYearR": 0.015,
            "beta": 0.93,
            "years": 5
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.daily_avg_usage, 100.0, epsilon = 1e-9);
        assert_relative_eq!(out.baseline_value, 7500.0, epsilon = 1e-9);
        assert_relative_eq!(out.total_value, 9000.0, epsilon = 1e-9);
        assert_relative_eq!(out.usage_change_pct, 0.2, epsilon = 1e-9);

        let r = (1.2 / 1.015f64.powf(1.0 / 12.0)).ln();
        assert_relative_eq!(out.r, r, epsilon = 1e-6);
        let index = (r * 5.0).exp() * 0.93;
        assert_relative_eq!(out.market_index, index, epsilon = 1e-5);
        assert_relative_eq!(out.reappraised_cost, 9000.0 * index, epsilon = 1e-2);
        assert!(!out.t_usage_up30);
    }

    #[test]
    fn test_direct_values_override_derivation() {
        let input = ModelInput::new(json!({
            "totalValue": 130, "baselineValue": 100, "beta": 1, "years": 1
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.usage_change_pct, 0.3, epsilon = 1e-9);
        assert!(out.t_usage_up30);
        assert_relative_eq!(out.reappraised_cost, 130.0 * 1.3, epsilon = 1e-4);
    }

    #[test]
    fn test_empty_input_is_numeric() {
        let out = calculate(&ModelInput::default());
        assert!(out.reappraised_cost.is_finite());
        assert!(out.r.is_finite());
    }
}
