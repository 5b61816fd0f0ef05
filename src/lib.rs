//! SEBIT models - financial calculators behind a shared dispatch engine
//!
//! This library implements the SEBIT valuation models, a registry that
//! addresses them by name, an output sanitizer and the session reporting
//! used by the `sebit`, `sebit-mcp` and `sebit-server` binaries.
//!
//! # Features
//!
//! - Twelve numeric calculators (DDA, LAM, RVM, CEEM, BDM, BELM, CPRM, OCIM,
//!   FAREX, TCTBEAM, CPMRV, DCBPRA) over loosely-typed JSON input
//! - Journal book writer (per-vendor `.xlsx` workbooks with an audit log)
//! - Sanitized, JSON-safe output in three modes
//! - Session tracking and Markdown session reports
//!
//! # Example
//!
//! ```no_run
//! use sebit_models::core::{Engine, EngineConfig, EvaluateOptions};
//! use serde_json::json;
//!
//! let engine = Engine::new(EngineConfig::default());
//! let result = engine.evaluate(
//!     "bdm",
//!     &json!({ "carryingAmountStart": 980, "faceValue": 1000,
//!              "couponRatePerPeriod": 0.025, "yieldRatePerPeriod": 0.03 }),
//!     EvaluateOptions::default(),
//! );
//! println!("{}", result.to_pretty_string());
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod mcp;
pub mod models;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use crate::core::{Engine, EngineConfig, EvaluateOptions, Evaluation, SanitizeMode};
pub use error::{SebitError, SebitResult};
