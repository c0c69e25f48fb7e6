//! Insight generator - runs the registered rules over a bill history

use crate::config::InsightConfig;
use crate::models::Bill;

use super::rules::{
    AboveAverageRule, ConsumptionChangeRule, InsightRule, SolarSavingsRule, TariffFlagRule,
    ValueIncreaseRule,
};
use super::types::Insight;

/// Evaluates rules in registration order and keeps the first few results
pub struct InsightGenerator {
    rules: Vec<Box<dyn InsightRule>>,
    config: InsightConfig,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightGenerator {
    /// Create a generator with the built-in rules and default thresholds
    pub fn new() -> Self {
        Self::with_config(InsightConfig::default())
    }

    /// Create a generator with the built-in rules and custom thresholds
    pub fn with_config(config: InsightConfig) -> Self {
        let mut generator = Self {
            rules: vec![],
            config,
        };

        // Order matters: output is truncated after evaluation
        generator.register(Box::new(ConsumptionChangeRule));
        generator.register(Box::new(TariffFlagRule));
        generator.register(Box::new(ValueIncreaseRule));
        generator.register(Box::new(AboveAverageRule));
        generator.register(Box::new(SolarSavingsRule));

        generator
    }

    /// Register a rule after the existing ones
    pub fn register(&mut self, rule: Box<dyn InsightRule>) {
        self.rules.push(rule);
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Generate insights for a history ordered most recent first
    ///
    /// Fewer than two bills leave nothing to compare, so the result is empty.
    pub fn generate(&self, history: &[Bill]) -> Vec<Insight> {
        if history.len() < 2 {
            return vec![];
        }

        let mut insights = Vec::new();
        for rule in &self.rules {
            if let Some(insight) = rule.evaluate(history, &self.config) {
                tracing::debug!(rule = rule.id(), kind = %insight.kind, "Insight produced");
                insights.push(insight);
            }
        }

        insights.truncate(self.config.max_insights);
        insights
    }

    /// Identifiers of the registered rules, in order
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}
