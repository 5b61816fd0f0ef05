//! FAREX - FX indicator adjusted for the trade balance.
//!
//! Four observation points (last year / this year x previous / current
//! month) each give an export-import imbalance ratio. The log ratio of last
//! year's to this year's imbalance is the beta, which scales the change in
//! export/import coverage into an adjustment index for the current rate.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{div, round_to, try_frac};

const EPS: f64 = 1e-9;

/// Alias lists for one observation point.
struct Period {
    export: &'static [&'static str],
    import: &'static [&'static str],
    export_share: &'static str,
    import_share: &'static str,
}

const LAST_YEAR_PREV: Period = Period {
    export: &[
        "prevYear_export_prev",
        "prevYearPrevMonthExport",
        "previousYearPrevMonthExport",
    ],
    import: &[
        "prevYear_import_prev",
        "prevYearPrevMonthImport",
        "previousYearPrevMonthImport",
    ],
    export_share: "lastYearPrevMonthExportShare",
    import_share: "lastYearPrevMonthImportShare",
};

const LAST_YEAR_CURR: Period = Period {
    export: &[
        "prevYear_export_curr",
        "prevYearCurrentMonthExport",
        "previousYearThisMonthExport",
        "prevYearThisMonthExport",
    ],
    import: &[
        "prevYear_import_curr",
        "prevYearCurrentMonthImport",
        "previousYearThisMonthImport",
        "prevYearThisMonthImport",
    ],
    export_share: "lastYearThisMonthExportShare",
    import_share: "lastYearThisMonthImportShare",
};

const THIS_YEAR_PREV: Period = Period {
    export: &[
        "currYear_export_prev",
        "currentYearPrevMonthExport",
        "thisYearPrevMonthExport",
    ],
    import: &[
        "currYear_import_prev",
        "currentYearPrevMonthImport",
        "thisYearPrevMonthImport",
    ],
    export_share: "thisYearPrevMonthExportShare",
    import_share: "thisYearPrevMonthImportShare",
};

const THIS_YEAR_CURR: Period = Period {
    export: &[
        "currYear_export_curr",
        "currentYearCurrentMonthExport",
        "thisYearThisMonthExport",
    ],
    import: &[
        "currYear_import_curr",
        "currentYearCurrentMonthImport",
        "thisYearThisMonthImport",
    ],
    export_share: "thisYearThisMonthExportShare",
    import_share: "thisYearThisMonthImportShare",
};

impl Period {
    fn export_amount(&self, input: &ModelInput) -> Option<f64> {
        input.pick_number(self.export)
    }

    fn import_amount(&self, input: &ModelInput) -> Option<f64> {
        input.pick_number(self.import)
    }

    /// Imbalance ratio from amounts, falling back to shares when neither
    /// amount is given.
    fn imbalance(&self, input: &ModelInput) -> f64 {
        let exp = self.export_amount(input);
        let imp = self.import_amount(input);
        if exp.is_some() || imp.is_some() {
            return ratio_from_amounts(exp.unwrap_or(0.0), imp.unwrap_or(0.0));
        }
        ratio_from_shares(
            try_frac(input.pick(&[self.export_share])),
            try_frac(input.pick(&[self.import_share])),
        )
    }
}

fn ratio_from_amounts(exp: f64, imp: f64) -> f64 {
    if exp != 0.0 {
        div(exp - imp, exp, 0.0)
    } else if imp != 0.0 {
        div(exp - imp, imp, 0.0)
    } else {
        0.0
    }
}

fn ratio_from_shares(exp_share: Option<f64>, imp_share: Option<f64>) -> f64 {
    let e = match (exp_share, imp_share) {
        (None, None) => return 0.0,
        (e, _) => e.unwrap_or(0.0),
    };
    if e <= 0.0 {
        return 0.0;
    }
    let i = imp_share.unwrap_or((1.0 - e).max(0.0));
    div(e - i, e, 0.0)
}

/// Export/import coverage over a year's two points; zero imports count as 1.
fn coverage(input: &ModelInput, prev: &Period, curr: &Period) -> f64 {
    let exports =
        prev.export_amount(input).unwrap_or(0.0) + curr.export_amount(input).unwrap_or(0.0);
    let imports =
        prev.import_amount(input).unwrap_or(0.0) + curr.import_amount(input).unwrap_or(0.0);
    let imports = if imports == 0.0 { 1.0 } else { imports };
    div(exports, imports, 0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FarexOutput {
    pub prev_imbalance_ratio: f64,
    pub curr_imbalance_ratio: f64,
    pub beta_raw: f64,
    pub beta: f64,
    pub beta_note: &'static str,
    pub trade_gap_term: f64,
    pub adjustment_index: f64,
    pub adjusted_fx_indicator: f64,
    pub fx_adjustment_pct: f64,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> FarexOutput {
    let options = input.options();
    let step = options.round_step();
    let r = |x: f64| round_to(x, step);
    let beta_clamp = options.number_or("betaClamp", 1.5);
    let weight_gap = options.number_or("weightTradeGap", 1.0);
    let neg_amplify = options.number_or("betaNegAmplify", 1.0);
    let pos_dampen = options.number_or("betaPosDampen", 1.0);

    let last_prev = LAST_YEAR_PREV.imbalance(input);
    let last_curr = LAST_YEAR_CURR.imbalance(input);
    let this_prev = THIS_YEAR_PREV.imbalance(input);
    let this_curr = THIS_YEAR_CURR.imbalance(input);
    let prev_imbalance = (last_prev + last_curr) / 2.0;
    let curr_imbalance = (this_prev + this_curr) / 2.0;

    let beta_raw = (prev_imbalance.abs().max(EPS) / curr_imbalance.abs().max(EPS)).ln();
    let scaled = if beta_raw >= 0.0 {
        beta_raw * pos_dampen
    } else {
        beta_raw * neg_amplify
    };
    let beta = scaled.min(beta_clamp).max(-beta_clamp);
    let beta_note = if beta_raw >= 0.0 {
        "imbalance improved versus last year (beta >= 0)"
    } else {
        "imbalance worsened versus last year (beta < 0)"
    };

    let trade_gap = coverage(input, &LAST_YEAR_PREV, &LAST_YEAR_CURR)
        - coverage(input, &THIS_YEAR_PREV, &THIS_YEAR_CURR);
    let adjustment_index = 1.0 + beta * weight_gap * trade_gap;

    let fx = input
        .pick_number(&["currentFx", "currentFX", "currentExchangeRate"])
        .unwrap_or(0.0);
    let adjusted_fx = div(fx, adjustment_index.max(EPS), fx);
    let fx_adjustment_pct = div(adjusted_fx - fx, fx, 0.0) * 100.0;

    let debug = options.debug().then(|| {
        Node::object()
            .with("lastYearPrevMonthRatio", r(last_prev))
            .with("lastYearThisMonthRatio", r(last_curr))
            .with("thisYearPrevMonthRatio", r(this_prev))
            .with("thisYearThisMonthRatio", r(this_curr))
            .with("betaClamp", beta_clamp)
            .with("weightTradeGap", weight_gap)
            .with("betaPosDampen", pos_dampen)
            .with("betaNegAmplify", neg_amplify)
            .with("fx", fx)
    });

    FarexOutput {
        prev_imbalance_ratio: r(prev_imbalance),
        curr_imbalance_ratio: r(curr_imbalance),
        beta_raw: r(beta_raw),
        beta: r(beta),
        beta_note,
        trade_gap_term: r(trade_gap),
        adjustment_index: r(adjustment_index),
        adjusted_fx_indicator: r(adjusted_fx),
        fx_adjustment_pct: r(fx_adjustment_pct),
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<FarexOutput> for Node {
    fn from(out: FarexOutput) -> Self {
        let mut node = Node::object()
            .with("prevImbalanceRatio", out.prev_imbalance_ratio)
            .with("currImbalanceRatio", out.curr_imbalance_ratio)
            .with("betaRaw", out.beta_raw)
            .with("beta", out.beta)
            .with("betaNote", out.beta_note)
            .with("tradeGapTerm", out.trade_gap_term)
            .with("adjustmentIndex", out.adjustment_index)
            .with("adjustedFxIndicator", out.adjusted_fx_indicator)
            .with("fxAdjustmentPct", out.fx_adjustment_pct);
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}
