//! Shared calculation plumbing: coercion, output tree, sanitizer, dispatch

pub mod engine;
pub mod format;
pub mod input;
pub mod node;
pub mod normalize;
pub mod registry;
pub mod sanitize;

pub use engine::{Engine, EngineConfig, EvaluateOptions, Evaluation};
pub use format::OutputFormat;
pub use input::{ModelInput, ModelOptions};
pub use node::Node;
pub use registry::ModelRegistry;
pub use sanitize::SanitizeMode;
