//! Analysis Tools
//!
//! The three steps the workflow drives: query generation, static validation
//! and insight synthesis.

pub mod insight_synthesizer;
pub mod sql_generator;
pub mod sql_validator;

pub use insight_synthesizer::InsightSynthesizer;
pub use sql_generator::SqlGenerator;
pub use sql_validator::SqlValidator;
