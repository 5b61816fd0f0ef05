//! OCIM - other comprehensive income compounded increase.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{calc_sensitivity, clamp, round_to, SensitivityMode};

const ANNUAL_INCREASE_TRIGGER: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OcimTriggers {
    pub t_annual30_up: bool,
    pub t_reclass_move: bool,
    pub t_capped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcimOutput {
    pub account_share: f64,
    pub base_oci: f64,
    pub sensitivity_factor: f64,
    pub compounded_oci: f64,
    pub after_quarter_adj: f64,
    pub after_extra_adj: f64,
    pub closing_oci_balance: f64,
    pub annual_increase_pct: f64,
    pub triggers: OcimTriggers,
    pub debug: Option<Node>,
}

/// A positive direct share wins (capped at 1); otherwise the amount ratio,
/// and 1 when that is missing or zero.
fn account_share(input: &ModelInput) -> f64 {
    let direct = input.frac(&["accountSharePct", "ociShare"], 0.0);
    if direct > 0.0 {
        return direct.min(1.0);
    }
    let account = input.number(&["accountOCIAmount"], 0.0);
    let total = input.number(&["totalOCIAllItems"], 0.0);
    let from_amounts = if total > 0.0 {
        clamp(account / total, 0.0, 1.0)
    } else {
        0.0
    };
    if from_amounts > 0.0 {
        from_amounts
    } else {
        1.0
    }
}

pub fn calculate(input: &ModelInput) -> OcimOutput {
    let options = input.options();
    let step = options.round_step();
    let clamp_on = options.flag("clampToCap", true);

    let share = account_share(input);
    let opening = input.number(&["openingOCIBalance", "openingBalance"], 0.0) * share;
    let current = input.number(&["currentPeriodOCI", "currentOCIChange"], 0.0) * share;
    let reclass = input.number(
        &["reclassificationAdjustments", "reclassificationAdj"],
        0.0,
    ) * share;
    let base = opening + current - reclass;

    let years = input.number(&["horizonYears", "years"], 1.0).max(1.0);
    let r = input.frac(&["marketChangeR"], 0.0);
    let beta = input.frac(&["beta"], 0.0);
    let sensitivity = calc_sensitivity(r, beta, years, SensitivityMode::Increment);
    let compounded = base * sensitivity;

    let after_quarter = compounded * (1.0 + input.frac(&["quarterAdjRate"], 0.0));
    let after_extra = after_quarter * (1.0 + input.frac(&["extraAdjPct"], 0.0));

    let mut closing = after_extra;
    let mut capped = false;
    if clamp_on {
        if let Some(min_cap) = input.opt_number(&["minCap"]) {
            if closing < min_cap {
                closing = min_cap;
                capped = true;
            }
        }
        if let Some(max_cap) = input.opt_number(&["maxCap"]) {
            if closing > max_cap {
                closing = max_cap;
                capped = true;
            }
        }
    }

    let annual_increase = if opening != 0.0 {
        (closing - opening) / opening.abs()
    } else {
        0.0
    };

    let debug = options.debug().then(|| {
        Node::object()
            .with("opening", opening)
            .with("current", current)
            .with("reclass", reclass)
            .with("years", years)
            .with("r", r)
            .with("beta", beta)
            .with(
                "notes",
                "balances scaled by account share; caps applied after adjustments",
            )
    });

    OcimOutput {
        account_share: round_to(share, step),
        base_oci: round_to(base, step),
        sensitivity_factor: round_to(sensitivity, step),
        compounded_oci: round_to(compounded, step),
        after_quarter_adj: round_to(after_quarter, step),
        after_extra_adj: round_to(after_extra, step),
        closing_oci_balance: round_to(closing, step),
        annual_increase_pct: round_to(annual_increase, step),
        triggers: OcimTriggers {
            t_annual30_up: annual_increase >= ANNUAL_INCREASE_TRIGGER,
            t_reclass_move: reclass != 0.0,
            t_capped: capped,
        },
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<OcimOutput> for Node {
    fn from(out: OcimOutput) -> Self {
        let mut node = Node::object()
            .with("accountShare", out.account_share)
            .with("baseOCI", out.base_oci)
            .with("sensitivityFactor", out.sensitivity_factor)
            .with("compoundedOCI", out.compounded_oci)
            .with("afterQuarterAdj", out.after_quarter_adj)
            .with("afterExtraAdj", out.after_extra_adj)
            .with("closingOCIBalance", out.closing_oci_balance)
            .with("annualIncreasePct", out.annual_increase_pct)
            .with(
                "triggers",
                Node::object()
                    .with("tAnnual30Up", out.triggers.t_annual30_up)
                    .with("tReclassMove", out.triggers.t_reclass_move)
                    .with("tCapped", out.triggers.t_capped),
            );
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}
