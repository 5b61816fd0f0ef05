//! BDM - bond effective-interest amortization for one period.

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::core::normalize::{round_to, try_frac};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondType {
    Discount,
    Premium,
    Par,
}

impl BondType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondType::Discount => "discount",
            BondType::Premium => "premium",
            BondType::Par => "par",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BdmOutput {
    pub period_coupon: f64,
    pub period_yield_interest: f64,
    pub amortization: f64,
    pub ending_carrying_amount: f64,
    pub is_discount_bond: bool,
    pub bond_type: BondType,
    pub debug: Option<Node>,
}

/// Per-period rate: an annual rate split over `periodsPerYear` wins over an
/// explicit per-period rate; a zero annual rate falls through.
fn per_period_rate(input: &ModelInput, annual: &[&str], per_period: &[&str]) -> f64 {
    let periods = input.number(&["periodsPerYear"], 1.0);
    let from_annual = input
        .opt_frac(annual)
        .filter(|_| periods > 0.0)
        .map(|rate| rate / periods)
        .filter(|rate| *rate != 0.0);
    from_annual
        .or_else(|| {
            per_period
                .iter()
                .find_map(|k| try_frac(input.pick(&[*k])).filter(|r| *r != 0.0))
        })
        .unwrap_or(0.0)
}

pub fn calculate(input: &ModelInput) -> BdmOutput {
    let options = input.options();
    let step = options.round_step();

    let carrying = input.number(&["carryingAmountStart", "issuePrice", "issueAmount"], 0.0);
    let face = input.number(&["faceValue"], 0.0);
    let coupon_rate = per_period_rate(
        input,
        &["couponRateAnnual", "couponRate"],
        &["couponRatePerPeriod", "couponPct"],
    );
    let yield_rate = per_period_rate(
        input,
        &["yieldRateAnnual", "marketYield"],
        &["yieldRatePerPeriod", "yieldPct"],
    );

    let period_coupon = face * coupon_rate;
    let yield_interest = carrying * yield_rate;
    let amortization = yield_interest - period_coupon;
    let ending = carrying + amortization;

    let bond_type = if carrying < face {
        BondType::Discount
    } else if carrying > face {
        BondType::Premium
    } else {
        BondType::Par
    };

    let debug = options.debug().then(|| {
        Node::object()
            .with("carryingAmountStart", carrying)
            .with("faceValue", face)
            .with("couponRatePerPeriod", coupon_rate)
            .with("yieldRatePerPeriod", yield_rate)
    });

    BdmOutput {
        period_coupon: round_to(period_coupon, step),
        period_yield_interest: round_to(yield_interest, step),
        amortization: round_to(amortization, step),
        ending_carrying_amount: round_to(ending, step),
        is_discount_bond: bond_type == BondType::Discount,
        bond_type,
        debug,
    }
}

pub fn run(input: &ModelInput) -> Node {
    calculate(input).into()
}

impl From<BdmOutput> for Node {
    fn from(out: BdmOutput) -> Self {
        let mut node = Node::object()
            .with("periodCoupon", out.period_coupon)
            .with("periodYieldInterest", out.period_yield_interest)
            .with("amortization", out.amortization)
            .with("endingCarryingAmount", out.ending_carrying_amount)
            .with("isDiscountBond", out.is_discount_bond)
            .with("bondType", out.bond_type.as_str());
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
    fn test_discount_bond_period() {
        let input = ModelInput::new(json!({
            "carryingAmountStart": 980,
            "faceValue": 1000,
            "couponRatePerPeriod": 0.025,
            "yieldRatePerPeriod": 0.03
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.period_coupon, 25.0, epsilon = 1e-9);
        assert_relative_eq!(out.period_yield_interest, 29.4, epsilon = 1e-9);
        assert_relative_eq!(out.amortization, 4.4, epsilon = 1e-9);
        assert_relative_eq!(out.ending_carrying_amount, 984.4, epsilon = 1e-9);
        assert!(out.is_discount_bond);
        assert_eq!(out.bond_type, BondType::Discount);
    }

    #[test]
    fn test_annual_rates_split_by_periods() {
        let input = ModelInput::new(json!({
            "issuePrice": "1,050",
            "faceValue": 1000,
            "couponRateAnnual": "8%",
            "yieldRateAnnual": 6,
            "periodsPerYear": 2
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.period_coupon, 40.0, epsilon = 1e-9);
        assert_relative_eq!(out.period_yield_interest, 31.5, epsilon = 1e-9);
        assert_relative_eq!(out.amortization, -8.5, epsilon = 1e-9);
        assert_eq!(out.bond_type, BondType::Premium);
        assert!(!out.is_discount_bond);
    }

    #[test]
    fn test_percent_string_per_period_alias() {
        let input = ModelInput::new(json!({
            "carryingAmountStart": 1000, "faceValue": 1000,
            "couponPct": "5%", "yieldPct": "5%"
        }));
        let out = calculate(&input);
        assert_relative_eq!(out.amortization, 0.0, epsilon = 1e-9);
        assert_eq!(out.bond_type, BondType::Par);
    }
}
