//! TCTBEAM - trigonometric cost tracking and break-even analysis.
//!
//! The year-over-year change in the variable-cost ratio becomes an angle
//! increment (1.0 of ratio = 180 degrees). The accumulated angle weights the
//! fixed cost by |sin| and the variable cost by |cos|, and its tangent scales
//! revenue into operating profit. The angle is kept inside (-90, 90) so the
//! tangent stays finite.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::round_to;

const EPS: f64 = 1e-9;

/// Largest angle magnitude, in degrees, the accumulator may hold.
pub const MAX_ANGLE_DEG: f64 = 89.999;

/// Normalize to [-180, 180) and pull anything at or beyond the tangent
/// singularity back to +/-[`MAX_ANGLE_DEG`].
pub fn clamp_deg(deg: f64) -> f64 {
    let d = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if d.abs() >= MAX_ANGLE_DEG {
        if d > 0.0 {
            MAX_ANGLE_DEG
        } else {
            -MAX_ANGLE_DEG
        }
    } else {
        d
    }
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

fn sum_last(values: &[f64], n: usize) -> f64 {
    values.iter().rev().take(n).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TctbeamFlags {
    pub near90_singularity: bool,
    pub crossed180: bool,
    pub break_even_zone: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TctbeamOutput {
    pub sum_fixed5: f64,
    pub sum_var5: f64,
    pub total_cost5: f64,
    pub fixed_ratio5: f64,
    pub var_ratio5: f64,
    pub yoy_delta_fixed_ratio: Option<f64>,
    pub yoy_delta_var_ratio: Option<f64>,
    pub theta_prev_deg: f64,
    pub delta_theta_deg: f64,
    pub theta_now_deg: f64,
    pub tan_theta: f64,
    pub base_fixed: f64,
    pub base_var: f64,
    pub adjusted_fixed: f64,
    pub adjusted_var: f64,
    pub total_cost_this_year: f64,
    pub revenue_this_year: f64,
    pub operating_profit: f64,
    /// Absent when the variable ratio leaves no contribution margin.
    pub break_even_revenue: Option<f64>,
    pub flags: TctbeamFlags,
    pub debug: Option<Node>,
}

/// YoY ratio deltas: from the last two array entries, else from explicit
/// ratio fields.
fn yoy_deltas(
    input: &ModelInput,
    fixed: Option<&[f64]>,
    variable: Option<&[f64]>,
) -> (Option<f64>, Option<f64>) {
    if let (Some(f), Some(v)) = (fixed, variable) {
        if f.len() >= 2 && v.len() >= 2 {
            let (pf, cf) = (f[f.len() - 2], f[f.len() - 1]);
            let (pv, cv) = (v[v.len() - 2], v[v.len() - 1]);
            let prev_total = (pf + pv).max(EPS);
            let curr_total = (cf + cv).max(EPS);
            return (
                Some(cf / curr_total - pf / prev_total),
                Some(cv / curr_total - pv / prev_total),
            );
        }
    }
    match (
        input.opt_number(&["fixedRatioPrevYear"]),
        input.opt_number(&["fixedRatioThisYear"]),
    ) {
        (Some(prev), Some(curr)) => {
            let delta_fixed = curr - prev;
            let delta_var = match (
                input.opt_number(&["variableRatioPrevYear"]),
                input.opt_number(&["variableRatioThisYear"]),
            ) {
                (Some(vp), Some(vc)) => vc - vp,
                _ => -delta_fixed,
            };
            (Some(delta_fixed), Some(delta_var))
        }
        _ => (None, None),
    }
}

pub fn calculate(input: &ModelInput) -> TctbeamOutput {
    let options = input.options();
    let step = options.round_step();
    let r = |x: f64| round_to(x, step);

    let fixed = input.numbers("fixedCosts").filter(|v| !v.is_empty());
    let variable = input.numbers("variableCosts").filter(|v| !v.is_empty());

    let sum_fixed5 = match &fixed {
        Some(values) => sum_last(values, 5),
        None => input.number(&["fixedCostTotal5y"], 0.0),
    };
    let sum_var5 = match &variable {
        Some(values) => sum_last(values, 5),
        None => input.number(&["variableCostTotal5y"], 0.0),
    };
    let total_cost5 = (sum_fixed5 + sum_var5).max(EPS);

    let (yoy_fixed, yoy_var) = yoy_deltas(input, fixed.as_deref(), variable.as_deref());

    let theta_prev = input.number(&["prevAccumAngle"], 0.0);
    let delta_theta = input
        .opt_number(&["deltaAngleThisYear"])
        .unwrap_or(yoy_var.unwrap_or(0.0) * 180.0);
    let theta_now = clamp_deg(theta_prev + delta_theta);
    let radians = theta_now.to_radians();
    let tan_theta = radians.tan();

    let base_fixed = fixed
        .as_ref()
        .and_then(|v| v.last().copied())
        .or_else(|| input.opt_number(&["currentYearFixed"]))
        .unwrap_or(input.number(&["fixedCostTotal5y"], 0.0) / 5.0);
    let base_var = variable
        .as_ref()
        .and_then(|v| v.last().copied())
        .or_else(|| input.opt_number(&["currentYearVariable"]))
        .unwrap_or(input.number(&["variableCostTotal5y"], 0.0) / 5.0);

    let adjusted_fixed = radians.sin().abs() * base_fixed;
    let adjusted_var = radians.cos().abs() * base_var;

    let given_revenue = input.opt_number(&["currentRevenue"]);
    let revenue = given_revenue.unwrap_or(base_fixed + base_var);
    let operating_profit = revenue * tan_theta;

    let current_total = (base_fixed + base_var).max(EPS);
    let var_ratio = input
        .opt_number(&["variableRatioThisYear"])
        .unwrap_or(base_var / current_total);
    let break_even = (1.0 - var_ratio > EPS).then(|| base_fixed / (1.0 - var_ratio));

    let flags = TctbeamFlags {
        near90_singularity: (theta_now.abs() - 90.0).abs() < 0.1,
        crossed180: sign(theta_prev) != sign(theta_now)
            && (theta_prev - theta_now).abs() > 179.0,
        break_even_zone: operating_profit.abs() < 1e-6,
    };

    let debug = options.debug().then(|| {
        let cost_source = match (&fixed, &variable) {
            (Some(_), Some(_)) => "arrays",
            (None, None) => "totals",
            _ => "mixed",
        };
        let ratio_source = match (yoy_var, fixed.as_ref().zip(variable.as_ref())) {
            (None, _) => "none",
            (Some(_), Some((f, v))) if f.len() >= 2 && v.len() >= 2 => "arrays",
            (Some(_), _) => "ratioFields",
        };
        Node::object()
            .with("costSource", cost_source)
            .with("ratioSource", ratio_source)
            .with("baseFixed", r(base_fixed))
            .with("baseVar", r(base_var))
            .with(
                "revenueSource",
                if given_revenue.is_some() {
                    "currentRevenue"
                } else {
                    "baseCosts"
                },
            )
            .with("prevAccumAngle", theta_prev)
    });

    TctbeamOutput {
        sum_fixed5: r(sum_fixed5),
        sum_var5: r(sum_var5),
        total_cost5: r(total_cost5),
        fixed_ratio5: r(sum_fixed5 / total_cost5),
        var_ratio5: r(sum_var5 / total_cost5),
        yoy_delta_fixed_ratio: yoy_fixed.map(r),
        yoy_delta_var_ratio: yoy_var.map(r),
        theta_prev_deg: r(theta_prev),
        delta_theta_deg: r(delta_theta),
        theta_now_deg: r(theta_now),
        tan_theta: r(tan_theta),
        base_fixed: r(base_fixed),
        base_var: r(base_var),
        adjusted_fixed: r(adjusted_fixed),
        adjusted_var: r(adjusted_var),
        total_cost_this_year: r(adjusted_fixed + adjusted_var),
        revenue_this_year: r(revenue),
        operating_profit: r(operating_profit),
        break_even_revenue: break_even.map(r),
        flags,
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<TctbeamOutput> for Node {
    fn from(out: TctbeamOutput) -> Self {
        let mut node = Node::object()
            .with("sumFixed5", out.sum_fixed5)
            .with("sumVar5", out.sum_var5)
            .with("totalCost5", out.total_cost5)
            .with("fixedRatio5", out.fixed_ratio5)
            .with("varRatio5", out.var_ratio5)
            .with("yoyDeltaFixedRatio", out.yoy_delta_fixed_ratio)
            .with("yoyDeltaVarRatio", out.yoy_delta_var_ratio)
            .with("thetaPrevDeg", out.theta_prev_deg)
            .with("deltaThetaDeg", out.delta_theta_deg)
            .with("thetaNowDeg", out.theta_now_deg)
            .with("tanTheta", out.tan_theta)
            .with("baseFixed", out.base_fixed)
            .with("baseVar", out.base_var)
            .with("adjustedFixed", out.adjusted_fixed)
            .with("adjustedVar", out.adjusted_var)
            .with("totalCostThisYear", out.total_cost_this_year)
            .with("revenueThisYear", out.revenue_this_year)
            .with("operatingProfit", out.operating_profit)
            .with("breakEvenRevenue", out.break_even_revenue)
            .with(
                "flags",
                Node::object()
                    .with("near90Singularity", out.flags.near90_singularity)
                    .with("crossed180", out.flags.crossed180)
                    .with("breakEvenZone", out.flags.break_even_zone),
            );
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}
