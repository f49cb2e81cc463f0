//! Routing decisions returned by the rule engine.

use serde::{Deserialize, Serialize};

/// A candidate processor the engine did not pick, with the fixed
/// weights the platform advertises for transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub processor: String,
    pub weight: f64,
    pub reason: String,
}

impl Alternative {
    /// Alternatives for every processor other than `selected`.
    pub fn all_except(selected: &str) -> Vec<Alternative> {
        let mut alternatives = Vec::new();
        if selected != "processor_a" {
            alternatives.push(Alternative {
                processor: "processor_a".to_string(),
                weight: 0.7,
                reason: "Primary processor with faster response time".to_string(),
            });
        }
        if selected != "processor_b" {
            alternatives.push(Alternative {
                processor: "processor_b".to_string(),
                weight: 0.3,
                reason: "Secondary processor with multi-currency support".to_string(),
            });
        }
        alternatives
    }
}

/// Result of evaluating the rule list against one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub target_processor: String,
    pub rule_matched: Option<String>,
    pub rule_priority: Option<i32>,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
}

/// The primary/secondary pair the orchestrator uses for failover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorRoute {
    pub primary: String,
    pub secondary: String,
}

impl ProcessorRoute {
    /// Default route used when the rule engine is unavailable or
    /// returns nothing usable.
    pub fn fallback() -> Self {
        Self {
            primary: "processor_a".to_string(),
            secondary: "processor_b".to_string(),
        }
    }
}
