//! Rule engine and its draw source.

mod engine;
mod sampler;

pub use engine::{default_rules, EngineStats, RuleEngine, RulesFile, RulesSnapshot};
pub use sampler::{Sampler, SeededSampler, ThreadRngSampler};
