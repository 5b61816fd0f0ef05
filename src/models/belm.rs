//! BELM - expected credit loss on settlement receivables.
//!
//! The settlement shortfall against schedule raises the loss rate (and a
//! surplus lowers it), weighted by the counterparty's exposure share and
//! grossed up by an interest adjustment factor. Last year's settlement share
//! and a manual adjustment are added on top.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{clamp, div, round_to};

pub const DEFAULT_BASE_EL_RATE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BelmTriggers {
    pub t_behind_schedule: bool,
    pub t_clamped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BelmOutput {
    pub total_debt: f64,
    pub expected_settlement_to_date: f64,
    pub performance_ratio: f64,
    pub interest_adj_factor: f64,
    pub contribution_share: f64,
    pub pre_adj_elr: f64,
    pub prev_year_share: f64,
    pub extra_adj_pct: f64,
    pub final_elr: f64,
    pub expected_loss: f64,
    pub triggers: BelmTriggers,
    pub debug: Option<Node>,
}

pub fn calculate(input: &ModelInput) -> BelmOutput {
    let options = input.options();
    let step = options.round_step();

    let daily = input.number(
        &["dailySettlement", "dailyExpectedSettlement", "dailyExpectedRepay"],
        0.0,
    );
    let years = input.number(&["usefulLifeYears"], 1.0);
    let elapsed_days = input.number(&["elapsedDays"], 0.0);
    let actual = input.number(&["actualSettlementToDate", "actualRepayToDate"], 0.0);
    let interest_rate = input.frac(&["interestRate", "nominalInterestRate"], 0.0);
    let base_rate = input.frac(&["baseELRate"], DEFAULT_BASE_EL_RATE);

    let total_debt = daily * years * 365.0;
    let expected_to_date = daily * elapsed_days;
    let performance = div(actual, expected_to_date, 1.0);
    let shortfall = 1.0 - performance;
    let interest_adj = 1.0 + shortfall * interest_rate;

    let contribution_share = input.opt_frac(&["contributionShare"]).unwrap_or_else(|| {
        div(
            input.number(&["clientExposure", "balanceByCounterparty"], 0.0),
            input.number(&["totalExposure", "totalARBalance"], 0.0),
            0.0,
        )
    });
    let pre_adj = (base_rate + shortfall * contribution_share) * interest_adj;

    let prev_year_share = input.opt_frac(&["prevYearShare"]).unwrap_or_else(|| {
        div(
            input.number(&["prevYearClientSettlement"], 0.0),
            input.number(&["prevYearTotalSettlement"], 0.0),
            0.0,
        )
    });
    let extra_adj = input.frac(&["extraAdjPct"], 0.0);

    let raw_elr = pre_adj + prev_year_share + extra_adj;
    let clamp_on = if options.has("clampELR01") {
        options.flag("clampELR01", true)
    } else if options.has("clamp01") {
        options.flag("clamp01", true)
    } else {
        input.flag(&["clampELR01"], true)
    };
    let final_elr = if clamp_on {
        clamp(raw_elr, 0.0, 1.0)
    } else {
        raw_elr
    };
    let expected_loss = total_debt * final_elr;

    let debug = options.debug().then(|| {
        Node::object()
            .with("dailySettlement", daily)
            .with("usefulLifeYears", years)
            .with("elapsedDays", elapsed_days)
            .with("actualSettlementToDate", actual)
            .with("interestRate", interest_rate)
            .with("baseELRate", base_rate)
            .with("rawELR", raw_elr)
    });

    BelmOutput {
        total_debt: round_to(total_debt, step),
        expected_settlement_to_date: round_to(expected_to_date, step),
        performance_ratio: round_to(performance, step),
        interest_adj_factor: round_to(interest_adj, step),
        contribution_share: round_to(contribution_share, step),
        pre_adj_elr: round_to(pre_adj, step),
        prev_year_share: round_to(prev_year_share, step),
        extra_adj_pct: round_to(extra_adj, step),
        final_elr: round_to(final_elr, step),
        expected_loss: round_to(expected_loss, step),
        triggers: BelmTriggers {
            t_behind_schedule: actual < expected_to_date,
            t_clamped: clamp_on && final_elr != raw_elr,
        },
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<BelmOutput> for Node {
    fn from(out: BelmOutput) -> Self {
        let mut node = Node::object()
            .with("totalDebt", out.total_debt)
            .with("expectedSettlementToDate", out.expected_settlement_to_date)
            .with("performanceRatio", out.performance_ratio)
            .with("interestAdjFactor", out.interest_adj_factor)
            .with("contributionShare", out.contribution_share)
            .with("preAdjELR", out.pre_adj_elr)
            .with("prevYearShare", out.prev_year_share)
            .with("extraAdjPct", out.extra_adj_pct)
            .with("finalELR", out.final_elr)
            .with("expectedLoss", out.expected_loss)
            .with(
                "triggers",
                Node::object()
                    .with("tBehindSchedule", out.triggers.t_behind_schedule)
                    .with("tClamped", out.triggers.t_clamped),
            );
        if let Some(debug) = out.debug {
            node.insert("debug", debug);
        }
        node
    }
}
