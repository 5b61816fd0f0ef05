//! CPRM - convertible bond conversion-rate risk.
//!
//! A base conversion ratio is reduced by the demand/supply adjustment and
//! an extra (bad debt) adjustment. Above 10% a second, fractional or
//! subtractive correction is applied; an optional stock-trading cap and the
//! configured bounds finish the pipeline.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{clamp, div, round_to};

const DD_SCALE: f64 = 0.24;
const FLOW_WEIGHT: f64 = 0.02;
const SECOND_STAGE_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CprmTriggers {
    pub t10_plus: bool,
    pub t_frac: bool,
    pub t_sub: bool,
    pub t_capped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CprmOutput {
    pub raw_conversion_rate: f64,
    pub adj_factor: f64,
    pub final_conversion_rate: f64,
    pub triggers: CprmTriggers,
    pub debug: Option<Node>,
}

struct Components {
    base_cr: f64,
    dd_adj: f64,
    extra_adj: f64,
}

/// Explicit `baseCR`/`ddAdj`/`extraAdj` win; otherwise they are derived from
/// the bond portfolio figures.
fn components(input: &ModelInput) -> Components {
    let total = input.number(&["totalBondAssets"], 0.0);
    let conv = input.number(&["convertibleBondAmount"], 0.0);
    let buy = input.number(&["buyTransactionAmount"], 0.0);
    let sell = input.number(&["sellTransactionAmount"], 0.0);
    let bad_occurred = input.number(&["badDebtOccurred"], 0.0);
    let bad_provision = input.number(&["badDebtProvision"], 0.0);

    let derived_base = div(conv, total, 0.0);
    let flow = div(sell - buy, buy + sell, 0.0);
    let derived_dd = FLOW_WEIGHT * flow;
    let derived_extra = div(bad_occurred + bad_provision, total, 0.0);

    Components {
        base_cr: input.opt_frac(&["baseCR", "baseRate"]).unwrap_or(derived_base),
        dd_adj: input.opt_frac(&["ddAdj"]).unwrap_or(derived_dd),
        extra_adj: input.opt_frac(&["extraAdj"]).unwrap_or(derived_extra),
    }
}

pub fn calculate(input: &ModelInput) -> CprmOutput {
    let options = input.options();
    let step = options.round_step();
    let Components {
        base_cr,
        dd_adj,
        extra_adj,
    } = components(input);

    let adj_factor = dd_adj / DD_SCALE;
    let after_first = base_cr * (1.0 - adj_factor);
    let mut cr = after_first - extra_adj;
    let mut triggers = CprmTriggers::default();

    if cr >= SECOND_STAGE_THRESHOLD {
        triggers.t10_plus = true;
        let frac = cr * (1.0 - extra_adj);
        let sub = cr - extra_adj;
        if extra_adj >= 0.0 {
            if frac >= 0.0 {
                cr = frac;
                triggers.t_frac = true;
            } else {
                cr = sub.max(0.0);
                triggers.t_sub = true;
            }
        } else if sub >= 0.0 {
            cr = sub;
            triggers.t_sub = true;
        } else {
            cr = frac.max(0.0);
            triggers.t_frac = true;
        }
    }

    let caps = input.nested("caps");
    if caps.flag(&["maxByStockTrading"], false) {
        if let Some(cap) = caps.opt_number(&["maxValue"]) {
            if cr > cap {
                cr = cap;
                triggers.t_capped = true;
            }
        }
    }

    let lo = options.number_or("clampMinCR", 0.0);
    let hi = options.number_or("clampMaxCR", 1.0);
    let final_cr = round_to(clamp(cr, lo, hi), step);

    let debug = options.debug().then(|| {
        Node::object()
            .with("baseCR", base_cr)
            .with("ddAdj", dd_adj)
            .with("extraAdj", extra_adj)
            .with("adjFactor", adj_factor)
            .with("afterFirst", after_first)
    });

    CprmOutput {
        raw_conversion_rate: round_to(base_cr, step),
        adj_factor: round_to(adj_factor, step),
        final_conversion_rate: final_cr,
        triggers,
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<CprmOutput> for Node {
    fn from(out: CprmOutput) -> Self {
        let mut node = Node::object()
            .with("rawConversionRate", out.raw_conversion_rate)
            .with("adjFactor", out.adj_factor)
            .with("finalConversionRate", out.final_conversion_rate)
            .with(
                "triggers",
                Node::object()
                    .with("t10Plus", out.triggers.t10_plus)
                    .with("tFrac", out.triggers.t_frac)
                    .with("tSub", out.triggers.t_sub)
                    .with("tCapped", out.triggers.t_capped),
            );
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
    fn test_second_stage_fractional_correction() {
        let input = ModelInput::new(json!({ "baseCR": 0.5, "ddAdj": 0.024, "extraAdj": 0.05 }));
        let out = calculate(&input);
        // 0.5 * (1 - 0.1) = 0.45; - 0.05 = 0.40; * 0.95 = 0.38
        assert_relative_eq!(out.adj_factor, 0.1, epsilon = 1e-9);
        assert_relative_eq!(out.final_conversion_rate, 0.38, epsilon = 1e-9);
        assert!(out.triggers.t10_plus);
        assert!(out.triggers.t_frac);
        assert!(!out.triggers.t_sub);
    }

    #[test]
    fn test_negative_extra_uses_subtraction() {
        let input = ModelInput::new(json!({ "baseCR": 0.3, "ddAdj": 0, "extraAdj": -0.02 }));
        let out = calculate(&input);
        // 0.3 + 0.02 = 0.32; sub: 0.32 + 0.02 = 0.34
        assert_relative_eq!(out.final_conversion_rate, 0.34, epsilon = 1e-9);
        assert!(out.triggers.t_sub);
    }

    #[test]
    fn test_below_threshold_single_stage() {
        let input = ModelInput::new(json!({ "baseCR": 0.08, "ddAdj": 0, "extraAdj": 0.01 }));
        let out = calculate(&input);
        assert_relative_eq!(out.final_conversion_rate, 0.07, epsilon = 1e-9);
        assert!(!out.triggers.t10_plus);
    }

    #[test]
    fn test_cap_and_clamp() {
        let input = ModelInput::new(json!({
            "baseCR": 0.9, "ddAdj": 0, "extraAdj": 0,
            "caps": { "maxByStockTrading": true, "maxValue": 0.25 }
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.final_conversion_rate, 0.25, epsilon = 1e-9);
        assert!(out.triggers.t_capped);

        let input = ModelInput::new(json!({
            "baseCR": 0.05, "ddAdj": 0, "extraAdj": 0.2,
            "options": { "clampMinCR": 0 }
        }));
        assert_eq!(calculate(&input).final_conversion_rate, 0.0);
    }

    #[test]
    fn test_derived_from_portfolio() {
        let input = ModelInput::new(json!({
            "totalBondAssets": 1_000_000,
            "convertibleBondAmount": 300_000,
            "buyTransactionAmount": 100_000,
            "sellTransactionAmount": 300_000,
            "badDebtOccurred": 10_000,
            "badDebtProvision": 10_000
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.raw_conversion_rate, 0.3, epsilon = 1e-9);
        // flow 0.5 -> ddAdj 0.01 -> adjFactor 1/24
        assert_relative_eq!(out.adj_factor, 0.01 / 0.24, epsilon = 1e-6);
    }
}
