//! DDA - dynamic depreciation with usage and market revaluation.
//!
//! Straight-line daily depreciation is scaled by the period's usage change,
//! then the resulting book value is revalued through the market sensitivity
//! factor.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{calc_sensitivity, clamp, div, round_to, SensitivityMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DdaTriggers {
    /// Sensitivity factor above 2.
    pub t1: bool,
    /// Usage change of 50% or more.
    pub t2: bool,
    /// Neither of the above.
    pub t3: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DdaOutput {
    pub daily_depreciation_base: f64,
    pub usage_change_pct: f64,
    pub adjusted_daily_depreciation: f64,
    pub sensitivity_factor: f64,
    pub book_value_after_use: f64,
    pub revaluation_value: f64,
    pub triggers: DdaTriggers,
    pub final_revalued_value: f64,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> DdaOutput {
    let options = input.options();
    let step = options.round_step();
    let clamp_to_bounds = options.flag("clampToBounds", true);

    let cost = input.number(&["acquisitionCost", "assetCost", "cost"], 0.0);
    let life_years = input.number(&["usefulLifeYears", "lifeYears"], 1.0);
    let life_days = (life_years * 365.0).round().max(1.0);

    let salvage = clamp(
        input.number(&["residualValue", "salvageValue", "salvage"], 0.0),
        0.0,
        cost.max(0.0),
    );
    let elapsed = clamp(
        input.number(&["elapsedUseDays", "elapsedDays"], 0.0),
        0.0,
        life_days,
    );
    let period = clamp(
        input.number(&["periodUseDays", "currentPeriodUseDays"], 0.0),
        0.0,
        life_days - elapsed,
    );
    let usage_r = clamp(input.frac(&["usageChangeR", "usageChangePct"], 0.0), -0.99, 10.0);
    let beta = clamp(input.frac(&["beta"], 0.0), 0.0, 1.0);
    let r = clamp(input.frac(&["marketChangeR"], 0.0), -1.0, 1.0);

    let depreciable = (cost - salvage).max(0.0);
    let daily_base = div(depreciable, life_days, 0.0);
    let adjusted_daily = daily_base * (1.0 + usage_r);
    let begin_book_value = cost - daily_base * elapsed;
    let mut book_after = begin_book_value - adjusted_daily * period;

    let sensitivity = calc_sensitivity(r, beta, life_years, SensitivityMode::Decrement);
    let mut revaluation = book_after * sensitivity;

    let t1 = sensitivity > 2.0;
    let t2 = usage_r >= 0.5;
    let triggers = DdaTriggers {
        t1,
        t2,
        t3: !(t1 || t2),
    };

    if clamp_to_bounds {
        book_after = clamp(book_after, salvage, cost.max(salvage));
        revaluation = clamp(revaluation, salvage, cost.max(salvage));
    }

    let debug = options.debug().then(|| {
        Node::object()
            .with("cost", cost)
            .with("salvage", salvage)
            .with("lifeYears", life_years)
            .with("elapsedDays", elapsed)
            .with("periodDays", period)
            .with("beginBV", round_to(begin_book_value, step))
            .with("depreciable", round_to(depreciable, step))
            .with("r", r)
            .with("beta", beta)
    });

    DdaOutput {
        daily_depreciation_base: round_to(daily_base, step),
        usage_change_pct: round_to(usage_r, step),
        adjusted_daily_depreciation: round_to(adjusted_daily, step),
        sensitivity_factor: round_to(sensitivity, step),
        book_value_after_use: round_to(book_after, step),
        revaluation_value: round_to(revaluation, step),
        triggers,
        final_revalued_value: round_to(revaluation, step),
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<DdaOutput> for Node {
    fn from(out: DdaOutput) -> Self {
        let triggers = Node::object()
            .with("t1", out.triggers.t1)
            .with("t2", out.triggers.t2)
            .with("t3", out.triggers.t3);
        let mut node = Node::object()
            .with("dailyDepreciationBase", out.daily_depreciation_base)
            .with("usageChangePct", out.usage_change_pct)
            .with("adjustedDailyDepreciation", out.adjusted_daily_depreciation)
            .with("sensitivityFactor", out.sensitivity_factor)
            .with("bookValueAfterUse", out.book_value_after_use)
            .with("revaluationValue", out.revaluation_value)
            .with("triggers", triggers)
            .with("finalRevaluedValue", out.final_revalued_value);
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

    fn base_input() -> ModelInput {
        ModelInput::new(json!({
            "acquisitionCost": 1_000_000,
            "residualValue": 100_000,
            "usefulLifeYears": 5,
            "elapsedUseDays": 365,
            "periodUseDays": 30,
            "usageChangeR": 0.2,
            "beta": 0.5,
            "marketChangeR": 0.1
        }))
    }

    #[test]
    fn test_daily_base_and_usage_adjustment() {
        let out = calculate(&base_input());
        let daily = 900_000.0 / 1825.0;
        assert_relative_eq!(out.daily_depreciation_base, daily, epsilon = 1e-6);
        assert_relative_eq!(out.adjusted_daily_depreciation, daily * 1.2, epsilon = 1e-6);
        assert_relative_eq!(out.usage_change_pct, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_revaluation_uses_sensitivity() {
        let out = calculate(&base_input());
        let daily = 900_000.0 / 1825.0;
        let book = 1_000_000.0 - daily * 365.0 - daily * 1.2 * 30.0;
        let s = (0.5f64 * 0.1 * (1.0 + 4.0 / 5.0)).exp();
        assert_relative_eq!(out.sensitivity_factor, s, epsilon = 1e-6);
        assert_relative_eq!(out.book_value_after_use, book, epsilon = 1e-5);
        assert_relative_eq!(out.revaluation_value, book * s, epsilon = 1e-4);
        assert_eq!(out.final_revalued_value, out.revaluation_value);
        assert!(out.triggers.t3);
    }

    #[test]
    fn test_heavy_usage_fires_t2() {
        let input = ModelInput::new(json!({
            "cost": 1000, "lifeYears": 1, "periodUseDays": 10, "usageChangePct": "60%"
        }));
        let out = calculate(&input);
        assert!(out.triggers.t2);
        assert!(!out.triggers.t3);
    }

    #[test]
    fn test_clamped_to_cost_bounds() {
        let input = ModelInput::new(json!({
            "cost": 1000, "salvage": 100, "lifeYears": 1,
            "beta": 1, "marketChangeR": 1
        }));
        let out = calculate(&input);
        assert!(out.revaluation_value <= 1000.0);
        assert!(out.revaluation_value >= 100.0);
    }

    #[test]
    fn test_empty_input_is_finite() {
        let out = calculate(&ModelInput::default());
        assert_eq!(out.daily_depreciation_base, 0.0);
        assert!(out.revaluation_value.is_finite());
        assert!(out.debug.is_none());
    }

    #[test]
    fn test_debug_block() {
        let input = ModelInput::new(json!({ "cost": 10, "options": { "debug": true } }));
        let node: Node = calculate(&input).into();
        assert_eq!(node.get("debug").and_then(|d| d.get("cost")).and_then(Node::as_f64), Some(10.0));
    }

    #[test]
    fn test_negative_cost_has_no_depreciable_base() {
        let out = calculate(&ModelInput::new(json!({
            "acquisitionCost": -1000,
            "usefulLifeYears": 2,
            "periodUseDays": 30
        })));
        assert_eq!(out.daily_depreciation_base, 0.0);
        assert_eq!(out.adjusted_daily_depreciation, 0.0);
    }
}
