//! CPMRV - cryptocurrency performance and real value.
//!
//! Last year's growth/decline pair gives a log performance `R_prev`; the
//! year-to-date pair gives `R_ytd`. Their gap spread over the horizon is the
//! monthly risk spread `RS`, which turns the spot value into a real value.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{div, round_to, safe_division, safe_log};

const LOG_EPS: f64 = 1e-6;
const DIV_EPS: f64 = 1e-9;
const DEFAULT_HORIZON_MONTHS: f64 = 12.0;

/// `ln((1 + growth) / (1 - decline))`, guarded against a zero denominator
/// and a non-positive ratio.
pub fn log_performance(growth: f64, decline: f64) -> f64 {
    safe_log(safe_division(1.0 + growth, 1.0 - decline, DIV_EPS), LOG_EPS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpmrvOutput {
    pub r_prev: f64,
    pub r_ytd: f64,
    pub rs: f64,
    pub v_current: f64,
    pub crypto_real_value: f64,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> CpmrvOutput {
    let options = input.options();
    let step = options.round_step();

    let g_prev = input.frac(&["previousYearGrowthRate"], 0.0);
    let d_prev = input.frac(&["previousYearDeclineRate"], 0.0);
    let g_ytd = input.frac(&["currentYearGrowthYTD", "currentYearGrowthRate"], 0.0);
    let d_ytd = input.frac(&["currentYearDeclineYTD", "currentYearDeclineRate"], 0.0);

    let horizon = input
        .opt_number(&["horizonMonths"])
        .or_else(|| options.number("horizonMonths"))
        .unwrap_or(DEFAULT_HORIZON_MONTHS)
        .round()
        .max(1.0);
    let spot = input.number(&["currentCryptocurrencyValue", "baseValue"], 0.0);

    let r_prev = log_performance(g_prev, d_prev);
    let r_ytd = log_performance(g_ytd, d_ytd);
    let rs = div(r_prev - r_ytd, horizon, 0.0);
    let v_current = 1.0 + div(1.0, 1.0 + rs, 0.0);
    let real_value = spot * v_current;

    let debug = options.debug().then(|| {
        Node::object()
            .with(
                "inputs",
                Node::object()
                    .with("g_prev", g_prev)
                    .with("d_prev", d_prev)
                    .with("g_ytd", g_ytd)
                    .with("d_ytd", d_ytd)
                    .with("horizon", horizon)
                    .with("spot", spot),
            )
            .with("R_ytd", r_ytd)
    });

    CpmrvOutput {
        r_prev: round_to(r_prev, step),
        r_ytd: round_to(r_ytd, step),
        rs: round_to(rs, step),
        v_current: round_to(v_current, step),
        crypto_real_value: round_to(real_value, step),
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<CpmrvOutput> for Node {
    fn from(out: CpmrvOutput) -> Self {
        let mut node = Node::object()
            .with("R_prev", out.r_prev)
            .with("R_ytd", out.r_ytd)
            .with("RS", out.rs)
            .with("V_current", out.v_current)
            .with("cryptoRealValue", out.crypto_real_value);
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
    fn test_worked_example() {
        let input = ModelInput::new(json!({
            "previousYearGrowthRate": "20%",
            "previousYearDeclineRate": "10%",
            "currentYearGrowthYTD": "15%",
            "currentYearDeclineYTD": "5%",
            "horizonMonths": 12,
            "currentCryptocurrencyValue": 50_000
        }));
        let out = calculate(&input);

        let r_prev = (1.2f64 / 0.9).ln();
        let r_ytd = (1.15f64 / 0.95).ln();
        let rs = (r_prev - r_ytd) / 12.0;
        let v = 1.0 + 1.0 / (1.0 + rs);
        assert_relative_eq!(out.r_prev, r_prev, epsilon = 1e-6);
        assert_relative_eq!(out.rs, rs, epsilon = 1e-6);
        assert_relative_eq!(out.v_current, v, epsilon = 1e-6);
        assert_relative_eq!(out.crypto_real_value, 50_000.0 * v, epsilon = 1e-6);
    }

    #[test]
    fn test_horizon_is_rounded_and_at_least_one() {
        let input = ModelInput::new(json!({
            "previousYearGrowthRate": 0.2,
            "horizonMonths": 0.2
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.rs, 1.2f64.ln(), epsilon = 1e-6);

        let input = ModelInput::new(json!({
            "previousYearGrowthRate": 0.2,
            "options": { "horizonMonths": 2 }
        }));
        assert_relative_eq!(calculate(&input).rs, 1.2f64.ln() / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_full_decline_stays_finite() {
        let input = ModelInput::new(json!({
            "previousYearDeclineRate": "100%",
            "currentCryptocurrencyValue": 10
        }));
        let out = calculate(&input);
        assert!(out.r_prev.is_finite());
        assert!(out.crypto_real_value.is_finite());
    }

    #[test]
    fn test_empty_input_is_spot_times_two() {
        let input = ModelInput::new(json!({ "baseValue": 100 }));
        let out = calculate(&input);
        assert_eq!(out.r_prev, 0.0);
        assert_eq!(out.v_current, 2.0);
        assert_eq!(out.crypto_real_value, 200.0);
    }
}
