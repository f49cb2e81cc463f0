//! Routing domain: rules, requests, and decisions.

mod decision;
mod rule;

pub use decision::{Alternative, Evaluation, ProcessorRoute};
pub use rule::{RoutingRequest, RoutingRule, RuleCondition, ThresholdOperator};
