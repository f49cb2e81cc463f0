//! Rule engine - the routing authority.
//!
//! Holds a prioritized rule list behind a read-write lock, evaluates
//! requests against it, and hot-reloads the list from a declarative
//! YAML file. Readers snapshot the list; writers swap it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::routing::{
    Alternative, Evaluation, ProcessorRoute, RoutingRequest, RoutingRule,
};
use crate::ports::RoutingAuthority;

use super::sampler::Sampler;

/// Shape of the routing-rules YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<Timestamp>,
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
}

struct EngineState {
    rules: Vec<RoutingRule>,
    last_reload: Timestamp,
    reload_count: u64,
}

/// Evaluation counters, exposed at the stats endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub total_evaluations: u64,
    pub rule_hits: HashMap<String, u64>,
    pub processor_distribution: HashMap<String, u64>,
    pub average_eval_time_ms: f64,
}

/// Snapshot of the configured rules plus reload bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct RulesSnapshot {
    pub rules: Vec<RoutingRule>,
    pub total_rules: usize,
    pub active_rules: usize,
    pub last_reload: Timestamp,
    pub reload_count: u64,
}

/// Prioritized, hot-reloadable predicate router.
pub struct RuleEngine {
    state: RwLock<EngineState>,
    stats: Mutex<EngineStats>,
    rules_path: Option<PathBuf>,
    sampler: Box<dyn Sampler>,
    defaults: ProcessorRoute,
}

impl RuleEngine {
    /// Builds an engine from the YAML file at `rules_path`. A missing
    /// or unparseable file loads the built-in default rule set so the
    /// system still boots.
    pub fn from_file(
        rules_path: impl Into<PathBuf>,
        sampler: Box<dyn Sampler>,
        defaults: ProcessorRoute,
    ) -> Self {
        let rules_path = rules_path.into();
        let rules = match load_rules(&rules_path) {
            Ok(rules) => {
                tracing::info!(count = rules.len(), path = %rules_path.display(), "Loaded routing rules");
                rules
            }
            Err(err) => {
                tracing::warn!(
                    path = %rules_path.display(),
                    error = %err,
                    "Failed to load routing rules, using built-in defaults"
                );
                default_rules()
            }
        };

        Self::with_rules_inner(rules, Some(rules_path), sampler, defaults)
    }

    /// Builds an engine from an explicit rule list (tests, embedded use).
    pub fn with_rules(
        rules: Vec<RoutingRule>,
        sampler: Box<dyn Sampler>,
        defaults: ProcessorRoute,
    ) -> Self {
        Self::with_rules_inner(rules, None, sampler, defaults)
    }

    fn with_rules_inner(
        mut rules: Vec<RoutingRule>,
        rules_path: Option<PathBuf>,
        sampler: Box<dyn Sampler>,
        defaults: ProcessorRoute,
    ) -> Self {
        sort_rules(&mut rules);
        Self {
            state: RwLock::new(EngineState {
                rules,
                last_reload: Timestamp::now(),
                reload_count: 0,
            }),
            stats: Mutex::new(EngineStats::default()),
            rules_path,
            sampler,
            defaults,
        }
    }

    /// Evaluates the rule list against one request.
    ///
    /// Rules run in priority order. A percentage rule is taken iff a
    /// uniform draw lands under its percentage, otherwise evaluation
    /// continues - so consecutive percentage rules `{p, q}` see
    /// `{p, (1-p)q}` of traffic, by design of the original format.
    pub fn evaluate(&self, request: &RoutingRequest) -> Evaluation {
        let started = Instant::now();
        let evaluation = self.select(request);
        self.record_stats(&evaluation, started.elapsed().as_secs_f64() * 1000.0);
        evaluation
    }

    /// Evaluates without touching the stats counters (test endpoint).
    pub fn evaluate_quiet(&self, request: &RoutingRequest) -> Evaluation {
        self.select(request)
    }

    fn select(&self, request: &RoutingRequest) -> Evaluation {
        let rules = {
            let state = self.state.read().expect("rule list lock poisoned");
            state.rules.clone()
        };

        for rule in &rules {
            if !rule.is_active || !rule.matches(request) {
                continue;
            }
            if rule.is_percentage() && self.sampler.draw() >= rule.percentage {
                continue;
            }
            return Evaluation {
                target_processor: rule.target_processor.clone(),
                rule_matched: Some(rule.name.clone()),
                rule_priority: Some(rule.priority),
                confidence: rule.confidence(),
                alternatives: Alternative::all_except(&rule.target_processor),
            };
        }

        Evaluation {
            target_processor: self.defaults.primary.clone(),
            rule_matched: None,
            rule_priority: None,
            confidence: 0.5,
            alternatives: Alternative::all_except(&self.defaults.primary),
        }
    }

    /// Re-reads the YAML file and atomically swaps the rule list.
    pub fn reload(&self) -> Result<usize, DomainError> {
        let Some(path) = &self.rules_path else {
            return Err(DomainError::new(
                ErrorCode::ConfigError,
                "No rules file configured",
            ));
        };

        let mut rules = load_rules(path)
            .map_err(|err| DomainError::new(ErrorCode::ConfigError, err.to_string()))?;
        sort_rules(&mut rules);
        let count = rules.len();

        let mut state = self.state.write().expect("rule list lock poisoned");
        state.rules = rules;
        state.last_reload = Timestamp::now();
        state.reload_count += 1;

        tracing::info!(count, "Reloaded routing rules");
        Ok(count)
    }

    /// Replaces one rule in place. The name is immutable; the list is
    /// re-sorted because the priority may have changed.
    pub fn update_rule(&self, name: &str, mut rule: RoutingRule) -> Result<RoutingRule, DomainError> {
        let mut state = self.state.write().expect("rule list lock poisoned");

        let Some(position) = state.rules.iter().position(|r| r.name == name) else {
            return Err(DomainError::new(
                ErrorCode::RuleNotFound,
                format!("Rule {} not found", name),
            ));
        };

        rule.name = name.to_string();
        rule.updated_at = Some(Timestamp::now());
        state.rules[position] = rule.clone();
        sort_rules(&mut state.rules);
        Ok(rule)
    }

    /// Current rules plus reload bookkeeping.
    pub fn snapshot(&self) -> RulesSnapshot {
        let state = self.state.read().expect("rule list lock poisoned");
        let active_rules = state.rules.iter().filter(|r| r.is_active).count();
        RulesSnapshot {
            total_rules: state.rules.len(),
            active_rules,
            rules: state.rules.clone(),
            last_reload: state.last_reload,
            reload_count: state.reload_count,
        }
    }

    /// Current evaluation counters.
    pub fn stats(&self) -> EngineStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    fn record_stats(&self, evaluation: &Evaluation, eval_time_ms: f64) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.total_evaluations += 1;
        if let Some(rule) = &evaluation.rule_matched {
            *stats.rule_hits.entry(rule.clone()).or_insert(0) += 1;
        }
        *stats
            .processor_distribution
            .entry(evaluation.target_processor.clone())
            .or_insert(0) += 1;
        stats.average_eval_time_ms = if stats.average_eval_time_ms == 0.0 {
            eval_time_ms
        } else {
            (stats.average_eval_time_ms + eval_time_ms) / 2.0
        };
    }
}

#[async_trait]
impl RoutingAuthority for RuleEngine {
    async fn route(&self, request: &RoutingRequest) -> Result<ProcessorRoute, DomainError> {
        let evaluation = self.evaluate(request);
        let secondary = if evaluation.target_processor == self.defaults.primary {
            self.defaults.secondary.clone()
        } else {
            self.defaults.primary.clone()
        };
        Ok(ProcessorRoute {
            primary: evaluation.target_processor,
            secondary,
        })
    }
}

fn sort_rules(rules: &mut [RoutingRule]) {
    // Stable: equal priorities keep insertion order.
    rules.sort_by_key(|r| r.priority);
}

fn load_rules(path: &PathBuf) -> Result<Vec<RoutingRule>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let file: RulesFile = serde_yaml::from_str(&raw)?;
    Ok(file.routing_rules)
}

/// Built-in rule set used when no config file is available: a
/// high-value rule, a EUR/GBP rule, and a 70/30 percentage split.
pub fn default_rules() -> Vec<RoutingRule> {
    use serde_json::json;

    vec![
        RoutingRule {
            name: "high_value_transactions".to_string(),
            priority: 1,
            condition_type: "amount_threshold".to_string(),
            condition_value: json!({"amount": 1000.0, "operator": "greater_than"}),
            target_processor: "processor_a".to_string(),
            percentage: 100,
            is_active: true,
            description: Some("Route high-value transactions to primary processor".to_string()),
            updated_at: None,
        },
        RoutingRule {
            name: "euro_transactions".to_string(),
            priority: 2,
            condition_type: "currency".to_string(),
            condition_value: json!({"currencies": ["EUR", "GBP"]}),
            target_processor: "processor_b".to_string(),
            percentage: 100,
            is_active: true,
            description: Some("Route EUR/GBP to multi-currency processor".to_string()),
            updated_at: None,
        },
        RoutingRule {
            name: "default_primary_split".to_string(),
            priority: 10,
            condition_type: "percentage".to_string(),
            condition_value: json!({}),
            target_processor: "processor_a".to_string(),
            percentage: 70,
            is_active: true,
            description: Some("Default 70% to primary processor".to_string()),
            updated_at: None,
        },
        RoutingRule {
            name: "default_secondary_split".to_string(),
            priority: 11,
            condition_type: "percentage".to_string(),
            condition_value: json!({}),
            target_processor: "processor_b".to_string(),
            percentage: 30,
            is_active: true,
            description: Some("Default 30% to secondary processor".to_string()),
            updated_at: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::routing::SeededSampler;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Sampler that replays a scripted sequence of draws.
    struct SequenceSampler {
        draws: Mutex<VecDeque<u8>>,
    }

    impl SequenceSampler {
        fn new(draws: Vec<u8>) -> Self {
            Self {
                draws: Mutex::new(draws.into()),
            }
        }
    }

    impl Sampler for SequenceSampler {
        fn draw(&self) -> u8 {
            self.draws
                .lock()
                .unwrap()
                .pop_front()
                .expect("sequence sampler exhausted")
        }
    }

    fn rule(
        name: &str,
        priority: i32,
        condition_type: &str,
        condition_value: serde_json::Value,
        target: &str,
        percentage: u8,
    ) -> RoutingRule {
        RoutingRule {
            name: name.to_string(),
            priority,
            condition_type: condition_type.to_string(),
            condition_value,
            target_processor: target.to_string(),
            percentage,
            is_active: true,
            description: None,
            updated_at: None,
        }
    }

    fn request(amount_minor: i64, currency: &str) -> RoutingRequest {
        RoutingRequest {
            amount_minor,
            currency: currency.to_string(),
            ..Default::default()
        }
    }

    fn engine_with(rules: Vec<RoutingRule>) -> RuleEngine {
        RuleEngine::with_rules(
            rules,
            Box::new(SeededSampler::new(42)),
            ProcessorRoute::fallback(),
        )
    }

    #[test]
    fn lower_priority_number_wins_when_both_match() {
        let engine = engine_with(vec![
            rule(
                "r2",
                2,
                "currency",
                json!({"currencies": ["USD"]}),
                "processor_b",
                100,
            ),
            rule(
                "r1",
                1,
                "amount_threshold",
                json!({"amount": 10.0, "operator": "greater_than"}),
                "processor_a",
                100,
            ),
        ]);

        let evaluation = engine.evaluate(&request(5000, "USD"));
        assert_eq!(evaluation.rule_matched.as_deref(), Some("r1"));
        assert_eq!(evaluation.target_processor, "processor_a");
        assert_eq!(evaluation.rule_priority, Some(1));
        assert_eq!(evaluation.confidence, 0.9);
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let mut active = rule(
            "only",
            1,
            "currency",
            json!({"currencies": ["USD"]}),
            "processor_b",
            100,
        );
        active.is_active = false;
        let engine = engine_with(vec![active]);

        let evaluation = engine.evaluate(&request(100, "USD"));
        assert_eq!(evaluation.rule_matched, None);
        assert_eq!(evaluation.target_processor, "processor_a");
        assert_eq!(evaluation.confidence, 0.5);
    }

    #[test]
    fn no_match_falls_back_to_processor_a() {
        let engine = engine_with(vec![rule(
            "euros",
            1,
            "currency",
            json!({"currencies": ["EUR"]}),
            "processor_b",
            100,
        )]);

        let evaluation = engine.evaluate(&request(100, "USD"));
        assert_eq!(evaluation.target_processor, "processor_a");
        assert_eq!(evaluation.rule_matched, None);
        assert_eq!(evaluation.confidence, 0.5);
        assert_eq!(evaluation.alternatives.len(), 1);
        assert_eq!(evaluation.alternatives[0].processor, "processor_b");
    }

    #[test]
    fn percentage_rule_accepts_low_draw_and_passes_on_high() {
        let rules = vec![
            rule("split_a", 10, "percentage", json!({}), "processor_a", 70),
            rule("split_b", 11, "percentage", json!({}), "processor_b", 100),
        ];

        // Draw 69 < 70: take split_a.
        let engine = RuleEngine::with_rules(
            rules.clone(),
            Box::new(SequenceSampler::new(vec![69])),
            ProcessorRoute::fallback(),
        );
        let evaluation = engine.evaluate(&request(100, "USD"));
        assert_eq!(evaluation.rule_matched.as_deref(), Some("split_a"));
        assert_eq!(evaluation.confidence, 0.6);

        // Draw 70 >= 70: fall through to split_b (draw 5 < 100).
        let engine = RuleEngine::with_rules(
            rules,
            Box::new(SequenceSampler::new(vec![70, 5])),
            ProcessorRoute::fallback(),
        );
        let evaluation = engine.evaluate(&request(100, "USD"));
        assert_eq!(evaluation.rule_matched.as_deref(), Some("split_b"));
        assert_eq!(evaluation.target_processor, "processor_b");
    }

    #[test]
    fn percentage_split_distribution_is_statistical() {
        let engine = RuleEngine::with_rules(
            vec![
                rule("split_a", 10, "percentage", json!({}), "processor_a", 70),
                rule("split_b", 11, "percentage", json!({}), "processor_b", 100),
            ],
            Box::new(SeededSampler::new(1234)),
            ProcessorRoute::fallback(),
        );

        let n = 10_000;
        let mut a_hits = 0u32;
        for _ in 0..n {
            if engine.evaluate(&request(100, "USD")).target_processor == "processor_a" {
                a_hits += 1;
            }
        }

        let fraction = f64::from(a_hits) / f64::from(n);
        // 3-sigma band around 0.7 for n = 10_000 is roughly +/- 0.014.
        assert!(
            (fraction - 0.7).abs() < 0.02,
            "processor_a fraction {} outside tolerance",
            fraction
        );
    }

    #[test]
    fn update_rule_preserves_name_and_resorts() {
        let engine = engine_with(vec![
            rule(
                "first",
                1,
                "currency",
                json!({"currencies": ["USD"]}),
                "processor_a",
                100,
            ),
            rule(
                "second",
                2,
                "currency",
                json!({"currencies": ["USD"]}),
                "processor_b",
                100,
            ),
        ]);

        let mut updated = rule(
            "renamed-ignored",
            0,
            "currency",
            json!({"currencies": ["USD"]}),
            "processor_b",
            100,
        );
        updated.priority = 0;
        engine.update_rule("second", updated).unwrap();

        let evaluation = engine.evaluate(&request(100, "USD"));
        assert_eq!(evaluation.rule_matched.as_deref(), Some("second"));
        assert_eq!(evaluation.target_processor, "processor_b");
    }

    #[test]
    fn update_unknown_rule_errors() {
        let engine = engine_with(vec![]);
        let err = engine
            .update_rule(
                "ghost",
                rule(
                    "ghost",
                    1,
                    "currency",
                    json!({"currencies": ["USD"]}),
                    "processor_a",
                    100,
                ),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RuleNotFound);
    }

    #[test]
    fn default_rules_boot_the_engine() {
        let rules = default_rules();
        assert_eq!(rules.len(), 4);

        let engine = engine_with(rules);
        // High value in minor units: $1500 > $1000 threshold.
        let evaluation = engine.evaluate(&request(150_000, "USD"));
        assert_eq!(
            evaluation.rule_matched.as_deref(),
            Some("high_value_transactions")
        );
        assert_eq!(evaluation.target_processor, "processor_a");

        let evaluation = engine.evaluate(&request(100, "EUR"));
        assert_eq!(evaluation.rule_matched.as_deref(), Some("euro_transactions"));
        assert_eq!(evaluation.target_processor, "processor_b");
    }

    #[test]
    fn stats_count_evaluations_and_hits() {
        let engine = engine_with(vec![rule(
            "usd",
            1,
            "currency",
            json!({"currencies": ["USD"]}),
            "processor_a",
            100,
        )]);

        engine.evaluate(&request(100, "USD"));
        engine.evaluate(&request(100, "USD"));
        engine.evaluate(&request(100, "EUR"));

        let stats = engine.stats();
        assert_eq!(stats.total_evaluations, 3);
        assert_eq!(stats.rule_hits.get("usd"), Some(&2));
        assert_eq!(stats.processor_distribution.get("processor_a"), Some(&3));
    }

    #[tokio::test]
    async fn route_pairs_target_with_the_other_processor() {
        let engine = engine_with(vec![rule(
            "euros",
            1,
            "currency",
            json!({"currencies": ["EUR"]}),
            "processor_b",
            100,
        )]);

        let route = engine.route(&request(100, "EUR")).await.unwrap();
        assert_eq!(route.primary, "processor_b");
        assert_eq!(route.secondary, "processor_a");

        let route = engine.route(&request(100, "USD")).await.unwrap();
        assert_eq!(route.primary, "processor_a");
        assert_eq!(route.secondary, "processor_b");
    }

    #[test]
    fn yaml_rules_file_parses() {
        let yaml = r#"
version: "1.0"
routing_rules:
  - name: high_value
    priority: 1
    condition_type: amount_threshold
    condition_value:
      amount: 500.0
      operator: greater_than
    target_processor: processor_a
    percentage: 100
    is_active: true
  - name: split
    priority: 10
    condition_type: percentage
    condition_value: {}
    target_processor: processor_b
    percentage: 30
"#;
        let file: RulesFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.routing_rules.len(), 2);
        assert_eq!(file.routing_rules[0].name, "high_value");
        assert!(file.routing_rules[1].is_active);
    }
}
