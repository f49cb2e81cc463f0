//! Routing rules: prioritized predicates that pick a processor.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::Timestamp;

/// Comparison operator for amount-threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOperator {
    GreaterThan,
    LessThan,
    Equals,
    GreaterEqual,
    LessEqual,
}

impl ThresholdOperator {
    fn compare(&self, amount: i64, threshold: i64) -> bool {
        match self {
            ThresholdOperator::GreaterThan => amount > threshold,
            ThresholdOperator::LessThan => amount < threshold,
            ThresholdOperator::Equals => amount == threshold,
            ThresholdOperator::GreaterEqual => amount >= threshold,
            ThresholdOperator::LessEqual => amount <= threshold,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "greater_than" => Some(ThresholdOperator::GreaterThan),
            "less_than" => Some(ThresholdOperator::LessThan),
            "equals" => Some(ThresholdOperator::Equals),
            "greater_equal" => Some(ThresholdOperator::GreaterEqual),
            "less_equal" => Some(ThresholdOperator::LessEqual),
            _ => None,
        }
    }
}

/// Typed view of a rule's condition payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    AmountThreshold {
        amount_minor: i64,
        operator: ThresholdOperator,
    },
    Currency(Vec<String>),
    Marketplace(Vec<String>),
    UserTier(Vec<String>),
    ClientId(Vec<String>),
    Percentage,
}

/// Context a charge request exposes to the rule engine.
#[derive(Debug, Clone, Default)]
pub struct RoutingRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub marketplace: Option<String>,
    pub user_tier: Option<String>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
}

/// One routing rule as configured.
///
/// The condition payload is kept as raw JSON and parsed leniently: a
/// malformed payload makes the rule unmatchable rather than poisoning
/// the whole rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub name: String,
    /// Smaller number = evaluated first.
    pub priority: i32,
    pub condition_type: String,
    #[serde(default)]
    pub condition_value: JsonValue,
    pub target_processor: String,
    /// Acceptance probability for `percentage` rules, 0..=100.
    #[serde(default = "default_percentage")]
    pub percentage: u8,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

fn default_percentage() -> u8 {
    100
}

fn default_is_active() -> bool {
    true
}

impl RoutingRule {
    /// Parses the raw condition payload into its typed form.
    ///
    /// Returns `None` when the payload does not fit the declared
    /// condition type; such a rule never matches.
    pub fn condition(&self) -> Option<RuleCondition> {
        match self.condition_type.as_str() {
            "amount_threshold" => {
                let amount = self.condition_value.get("amount")?.as_f64()?;
                let operator = self
                    .condition_value
                    .get("operator")
                    .and_then(|v| v.as_str())
                    .map_or(Some(ThresholdOperator::GreaterThan), ThresholdOperator::parse)?;
                Some(RuleCondition::AmountThreshold {
                    amount_minor: to_minor_units(amount),
                    operator,
                })
            }
            "currency" => Some(RuleCondition::Currency(string_list(
                &self.condition_value,
                "currencies",
            )?)),
            "marketplace" => Some(RuleCondition::Marketplace(string_list(
                &self.condition_value,
                "marketplaces",
            )?)),
            "user_tier" => Some(RuleCondition::UserTier(string_list(
                &self.condition_value,
                "tiers",
            )?)),
            "client_id" => Some(RuleCondition::ClientId(string_list(
                &self.condition_value,
                "client_ids",
            )?)),
            "percentage" => Some(RuleCondition::Percentage),
            _ => None,
        }
    }

    /// Tests the rule's predicate against a request.
    ///
    /// Percentage rules always match here; the acceptance draw is the
    /// engine's job because it is order-dependent.
    pub fn matches(&self, request: &RoutingRequest) -> bool {
        let Some(condition) = self.condition() else {
            return false;
        };

        match condition {
            RuleCondition::AmountThreshold {
                amount_minor,
                operator,
            } => operator.compare(request.amount_minor, amount_minor),
            RuleCondition::Currency(currencies) => currencies.contains(&request.currency),
            RuleCondition::Marketplace(marketplaces) => request
                .marketplace
                .as_ref()
                .is_some_and(|m| marketplaces.contains(m)),
            RuleCondition::UserTier(tiers) => request
                .user_tier
                .as_ref()
                .is_some_and(|t| tiers.contains(t)),
            RuleCondition::ClientId(client_ids) => request
                .client_id
                .as_ref()
                .is_some_and(|c| client_ids.contains(c)),
            RuleCondition::Percentage => true,
        }
    }

    /// Confidence heuristic by condition specificity.
    pub fn confidence(&self) -> f64 {
        match self.condition_type.as_str() {
            "amount_threshold" => 0.9,
            "currency" => 0.8,
            "marketplace" => 0.7,
            "percentage" => 0.6,
            _ => 0.5,
        }
    }

    /// Whether this rule gates acceptance on a random draw.
    pub fn is_percentage(&self) -> bool {
        self.condition_type == "percentage"
    }
}

fn string_list(value: &JsonValue, key: &str) -> Option<Vec<String>> {
    let items = value.get(key)?.as_array()?;
    items
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

/// Config files express amounts in major units; everything internal is
/// minor units.
fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
