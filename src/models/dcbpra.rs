//! DCBPRA - dynamic CAPM with a risk-spread adjusted beta.
//!
//! `betaAdjusted = beta * (1 + 1/(1 + RS))`, where `RS` is the CPMRV risk
//! spread. The CAPM expected return is then scaled by a growth factor
//! `I = 1 +/- |g|`.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::round_to;

pub const DEFAULT_EPSILON_GUARD: f64 = 1e-9;

const NOTE: &str = "beta_i = beta * (1 + 1/(1+RS)); I = 1 + g (g < 0: 1 - |g|)";

#[derive(Debug, Clone, PartialEq)]
pub struct DcbpraOutput {
    pub growth_factor: f64,
    pub beta_adjusted: f64,
    pub expected_return: f64,
    pub final_return: f64,
    pub debug: Option<Node>,
}

/// Growth adjustment `I`: an explicit `pctAdjust`, else `1 + g` where `g`
/// is a percentage (`5` means 5%).
fn growth_factor(input: &ModelInput) -> f64 {
    if let Some(direct) = input.opt_number(&["pctAdjust"]) {
        return direct;
    }
    let g = input.number(&["realGrowthPct", "actualGrowthRate"], 0.0) / 100.0;
    if g >= 0.0 {
        1.0 + g
    } else {
        1.0 - g.abs()
    }
}

/// `1 + 1/(1 + RS)`, keeping the denominator at least `eps` away from zero
/// unless infinity is allowed.
fn spread_multiplier(rs: f64, eps: f64, allow_infinity: bool) -> f64 {
    let denom = 1.0 + rs;
    if denom.abs() >= eps {
        return 1.0 + 1.0 / denom;
    }
    if allow_infinity {
        return f64::INFINITY;
    }
    let guarded = if rs >= 0.0 { eps } else { -eps };
    1.0 + 1.0 / guarded
}

fn round_finite(x: f64, step: f64) -> f64 {
    if x.is_finite() {
        round_to(x, step)
    } else {
        x
    }
}

pub fn calculate(input: &ModelInput) -> DcbpraOutput {
    let options = input.options();
    let step = options.round_step();
    let allow_infinity = options.flag("allowInfinity", false);
    let eps = options.number_or("epsilonGuard", DEFAULT_EPSILON_GUARD).abs();

    let rf = input.rate(&["riskFreeRate", "riskFree"], 0.0);
    let rm = input.rate(&["marketReturn", "baseReturn"], 0.0);
    let beta = input.number(&["beta"], 1.0);
    let rs = input.number(&["RS", "rs", "rsValue", "rPrev"], 0.0);
    let growth = growth_factor(input);

    let multiplier = spread_multiplier(rs, eps, allow_infinity);
    let beta_adjusted = if multiplier.is_infinite() {
        if beta > 0.0 {
            f64::INFINITY
        } else if beta < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    } else {
        beta * multiplier
    };

    let expected_return = if beta_adjusted.is_finite() {
        rf + beta_adjusted * (rm - rf)
    } else {
        beta_adjusted
    };
    let final_return = if expected_return.is_finite() {
        expected_return * growth
    } else {
        expected_return
    };

    let debug = options.debug().then(|| {
        Node::object()
            .with(
                "inputs",
                Node::object()
                    .with("rf", rf)
                    .with("rm", rm)
                    .with("beta", beta)
                    .with("RS", rs)
                    .with("realGrowthPct", &input.raw(&["realGrowthPct", "actualGrowthRate"]))
                    .with("pctAdjust", &input.raw(&["pctAdjust"])),
            )
            .with(
                "options",
                Node::object()
                    .with("allowInfinity", allow_infinity)
                    .with("eps", eps)
                    .with("step", step),
            )
    });

    DcbpraOutput {
        growth_factor: round_finite(growth, step),
        beta_adjusted: round_finite(beta_adjusted, step),
        expected_return: round_finite(expected_return, step),
        final_return: round_finite(final_return, step),
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<DcbpraOutput> for Node {
    fn from(out: DcbpraOutput) -> Self {
        let mut node = Node::object()
            .with("I", out.growth_factor)
            .with("betaAdjusted", out.beta_adjusted)
            .with("expectedReturn", out.expected_return)
            .with("finalReturn", out.final_return)
            .with("note", NOTE);
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
    fn test_capm_with_growth() {
        let input = ModelInput::new(json!({
            "riskFreeRate": "3%",
            "marketReturn": 0.08,
            "beta": 1.2,
            "RS": 0.25,
            "realGrowthPct": 5
        }));
        let out = calculate(&input);
        let beta_adj = 1.2 * (1.0 + 1.0 / 1.25);
        let expected = 0.03 + beta_adj * 0.05;
        assert_relative_eq!(out.growth_factor, 1.05, epsilon = 1e-9);
        assert_relative_eq!(out.beta_adjusted, beta_adj, epsilon = 1e-6);
        assert_relative_eq!(out.expected_return, expected, epsilon = 1e-6);
        assert_relative_eq!(out.final_return, expected * 1.05, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_growth_and_direct_adjust() {
        let input = ModelInput::new(json!({ "actualGrowthRate": -10 }));
        assert_relative_eq!(calculate(&input).growth_factor, 0.9, epsilon = 1e-9);

        let input = ModelInput::new(json!({ "pctAdjust": 1.3, "realGrowthPct": 50 }));
        assert_relative_eq!(calculate(&input).growth_factor, 1.3, epsilon = 1e-9);
    }

    #[test]
    fn test_rs_minus_one_is_guarded() {
        let input = ModelInput::new(json!({
            "RS": -1, "beta": 1, "riskFreeRate": 0.02, "marketReturn": 0.05
        }));
        let out = calculate(&input);
        assert!(out.beta_adjusted.is_finite());
        assert!(out.expected_return.is_finite());
        assert!(out.final_return.is_finite());
        // denominator pushed to -1e-9
        assert_relative_eq!(out.beta_adjusted, 1.0 - 1e9, max_relative = 1e-9);
    }

    #[test]
    fn test_rs_minus_one_allows_infinity() {
        let input = ModelInput::new(json!({
            "RS": -1, "beta": 2, "options": { "allowInfinity": true }
        }));
        let out = calculate(&input);
        assert_eq!(out.beta_adjusted, f64::INFINITY);
        assert_eq!(out.final_return, f64::INFINITY);

        let input = ModelInput::new(json!({
            "RS": -1, "beta": 0, "options": { "allowInfinity": true }
        }));
        assert_eq!(calculate(&input).beta_adjusted, 0.0);
    }

    #[test]
    fn test_defaults() {
        let out = calculate(&ModelInput::default());
        // beta 1, RS 0: 1 * (1 + 1) = 2
        assert_eq!(out.beta_adjusted, 2.0);
        assert_eq!(out.expected_return, 0.0);
        assert_eq!(out.growth_factor, 1.0);
    }
}
