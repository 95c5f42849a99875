use tracing::{info, warn};

use super::config::{BaselineConfig, VerificationMode};

/// Key of the configuration every ablation is measured against.
pub const REFERENCE_KEY: &str = "full";
/// Key of the configuration the headline significance test compares to.
pub const SINGLE_MODEL_KEY: &str = "single_model";

pub struct BaselineRegistry {
    configs: Vec<BaselineConfig>,
}

impl BaselineRegistry {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for config in builtin_configs() {
            registry.register(config);
        }
        registry
    }

    pub fn register(&mut self, config: BaselineConfig) {
        self.configs.retain(|c| c.key != config.key);
        self.configs.push(config);
    }

    pub fn get(&self, key: &str) -> Option<&BaselineConfig> {
        self.configs.iter().find(|c| c.key == key)
    }

    pub fn configs(&self) -> &[BaselineConfig] {
        &self.configs
    }

    /// Resolves `"all"` or a comma-separated key list. Unknown keys are
    /// warned about and skipped.
    pub fn select(&self, selection: &str) -> Vec<BaselineConfig> {
        let selection = selection.trim();
        if selection.eq_ignore_ascii_case("all") {
            return self.configs.clone();
        }

        let mut selected: Vec<BaselineConfig> = Vec::new();
        for key in selection.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            match self.get(key) {
                Some(config) => {
                    if !selected.iter().any(|c| c.key == config.key) {
                        selected.push(config.clone());
                    }
                }
                None => warn!(baseline = %key, "Unknown baseline, skipping"),
            }
        }

        info!(
            requested = %selection,
            selected = selected.len(),
            "Resolved baseline selection"
        );
        selected
    }
}

impl Default for BaselineRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn builtin_configs() -> Vec<BaselineConfig> {
    vec![
        BaselineConfig::new(SINGLE_MODEL_KEY, "Single Model")
            .with_description("Single LLM with no council deliberation")
            .with_council_size(1)
            .with_cross_review(false)
            .with_verification(VerificationMode::Off),
        BaselineConfig::new("self_consistency_3", "Self-Consistency (k=3)")
            .with_description("Same model sampled 3 times, vote on answer")
            .with_council_size(1)
            .with_cross_review(false)
            .with_verification(VerificationMode::Off)
            .with_samples(3),
        BaselineConfig::new("self_consistency_5", "Self-Consistency (k=5)")
            .with_description("Same model sampled 5 times, vote on answer")
            .with_council_size(1)
            .with_cross_review(false)
            .with_verification(VerificationMode::Off)
            .with_samples(5),
        BaselineConfig::new("majority_vote", "Majority Vote")
            .with_description("All council models, pick most common answer")
            .with_cross_review(false)
            .with_verification(VerificationMode::Off)
            .with_chairman(false),
        BaselineConfig::new(REFERENCE_KEY, "Council Full")
            .with_description("Full 4-stage pipeline with all features"),
        BaselineConfig::new("no_stage2", "Council (No Cross-Review)")
            .with_description("Skip Stage 2 cross-review")
            .with_cross_review(false),
        BaselineConfig::new("no_stage4", "Council (No Verification)")
            .with_description("Skip Stage 4 verification")
            .with_verification(VerificationMode::Off),
        BaselineConfig::new("minimal", "Council Minimal")
            .with_description("No cross-review, no verification")
            .with_cross_review(false)
            .with_verification(VerificationMode::Off),
    ]
}
