//! The SEBIT calculators
//!
//! Every numeric calculator is a pure `fn(&ModelInput) -> Node`; the journal
//! writer is the one stateful, fallible model. Both sit behind [`Model`].

pub mod bdm;
pub mod belm;
pub mod ceem;
pub mod cpmrv;
pub mod cprm;
pub mod dcbpra;
pub mod dda;
pub mod farex;
pub mod journal;
pub mod lam;
pub mod ocim;
pub mod rvm;
pub mod tctbeam;

use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::error::SebitResult;

pub use journal::JournalBook;

/// A named model the registry can dispatch to.
pub trait Model: Send + Sync {
    fn name(&self) -> &'static str;

    /// Human-readable title shown by `list_models`.
    fn label(&self) -> &'static str;

    fn run(&self, input: &ModelInput) -> SebitResult<Node>;
}

/// Adapter for the infallible calculators.
#[derive(Debug, Clone, Copy)]
pub struct CalculatorModel {
    name: &'static str,
    label: &'static str,
    func: fn(&ModelInput) -> Node,
}

impl CalculatorModel {
    pub const fn new(name: &'static str, label: &'static str, func: fn(&ModelInput) -> Node) -> Self {
        Self { name, label, func }
    }
}

impl Model for CalculatorModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn label(&self) -> &'static str {
        self.label
    }

    fn run(&self, input: &ModelInput) -> SebitResult<Node> {
        Ok((self.func)(input))
    }
}

/// The twelve numeric calculators in registry order.
pub const CALCULATORS: [CalculatorModel; 12] = [
    CalculatorModel::new("dda", "Dynamic Depreciation", dda::run),
    CalculatorModel::new("lam", "Lease Asset Model", lam::run),
    CalculatorModel::new("rvm", "Resource Valuation", rvm::run),
    CalculatorModel::new("ceem", "Consumable Expense Model", ceem::run),
    CalculatorModel::new("bdm", "Bond Effective Interest", bdm::run),
    CalculatorModel::new("belm", "Expected Loss", belm::run),
    CalculatorModel::new("cprm", "Convertible Bond Risk", cprm::run),
    CalculatorModel::new("ocim", "OCI Compounded Increase", ocim::run),
    CalculatorModel::new("farex", "FX Adjustment", farex::run),
    CalculatorModel::new("tctbeam", "Trigonometric Breakeven", tctbeam::run),
    CalculatorModel::new("cpmrv", "Crypto Real Value", cpmrv::run),
    CalculatorModel::new("dcbpra", "Beta-Adjusted Return", dcbpra::run),
];
