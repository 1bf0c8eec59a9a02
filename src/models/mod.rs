pub mod error;
pub mod evaluator;
pub mod forecaster;
pub mod metrics;
pub mod seasonal;
