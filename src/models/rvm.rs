//! RVM - natural resource (mining) valuation.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{calc_sensitivity, div, round_to, SensitivityMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSource {
    /// Log ratio of current to previous valuation.
    Valuation,
    /// Supplied `marketChangeR`.
    MarketChangeR,
}

impl MarketSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSource::Valuation => "valuation",
            MarketSource::MarketChangeR => "marketChangeR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RvmOutput {
    pub daily_avg_mined_value: f64,
    pub actual_daily_mined_value: f64,
    pub baseline_vs_actual_ratio: f64,
    pub r: f64,
    pub r_source: MarketSource,
    pub sensitivity_factor: f64,
    pub revalued_resource_value: f64,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> RvmOutput {
    let options = input.options();
    let step = options.round_step();

    let cumulative_value = input.number(&["cumulativeMinedValue", "cumulativeValue"], 0.0);
    let cumulative_days = input
        .number(&["cumulativeMiningDays", "cumulativeDays"], 1.0)
        .max(1.0);
    let period_value = input.number(&["currentPeriodMinedValue", "periodValue"], 0.0);
    let period_days = input
        .number(&["currentPeriodMiningDays", "periodDays"], 1.0)
        .max(1.0);
    let beta = input.number(&["beta"], 0.0);
    let years = input.number(&["usefulLifeYears", "years"], 1.0);

    let daily_avg = cumulative_value / cumulative_days;
    let actual_daily = period_value / period_days;
    let ratio = div(actual_daily, daily_avg, 0.0);

    let current = input.opt_number(&["currentValuation", "currentYearValuation"]);
    let previous = input.opt_number(&["prevYearValuation", "prevValuation"]);
    let (r, r_source) = match (current, previous) {
        (Some(c), Some(p)) if c > 0.0 && p > 0.0 => ((c / p).ln(), MarketSource::Valuation),
        _ => (
            input.number(&["marketChangeR"], 0.0),
            MarketSource::MarketChangeR,
        ),
    };

    let sensitivity = calc_sensitivity(r, beta, years, SensitivityMode::Decrement);
    let revalued = period_value * sensitivity;

    let debug = options.debug().then(|| {
        Node::object()
            .with("cumulativeValue", cumulative_value)
            .with("cumulativeDays", cumulative_days)
            .with("periodValue", period_value)
            .with("periodDays", period_days)
            .with("beta", beta)
            .with("years", years)
    });

    RvmOutput {
        daily_avg_mined_value: round_to(daily_avg, step),
        actual_daily_mined_value: round_to(actual_daily, step),
        baseline_vs_actual_ratio: round_to(ratio, step),
        r: round_to(r, step),
        r_source,
        sensitivity_factor: round_to(sensitivity, step),
        revalued_resource_value: round_to(revalued, step),
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<RvmOutput> for Node {
    fn from(out: RvmOutput) -> Self {
        let mut node = Node::object()
            .with("dailyAvgMinedValue", out.daily_avg_mined_value)
            .with("actualDailyMinedValue", out.actual_daily_mined_value)
            .with("baselineVsActualRatio", out.baseline_vs_actual_ratio)
            .with("r", out.r)
            .with("rSource", out.r_source.as_str())
            .with("sensitivityFactor", out.sensitivity_factor)
            .with("revaluedResourceValue", out.revalued_resource_value);
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}
