//! Routing rule engine configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Rule engine configuration.
///
/// The rule list itself lives in a separate YAML file so it can be
/// hot-reloaded without restarting the service; this section only
/// locates that file and names the fallback processors.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Path to the declarative routing-rules YAML file
    #[serde(default = "default_rules_path")]
    pub rules_path: String,

    /// Processor used when no rule matches, and the failover primary
    #[serde(default = "default_primary")]
    pub default_primary: String,

    /// Failover secondary processor
    #[serde(default = "default_secondary")]
    pub default_secondary: String,
}

impl RoutingConfig {
    /// Validate routing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_primary.is_empty() {
            return Err(ValidationError::MissingRequired("ROUTING default_primary"));
        }
        if self.default_secondary.is_empty() {
            return Err(ValidationError::MissingRequired("ROUTING default_secondary"));
        }
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            default_primary: default_primary(),
            default_secondary: default_secondary(),
        }
    }
}

fn default_rules_path() -> String {
    "configs/routing-rules.yaml".to_string()
}

fn default_primary() -> String {
    "processor_a".to_string()
}

fn default_secondary() -> String {
    "processor_b".to_string()
}
