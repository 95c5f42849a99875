use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Off,
    Consistency,
    Evidence,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Consistency => "consistency",
            Self::Evidence => "evidence",
        }
    }
}

impl std::fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline behaviour for one evaluation run. Built once from the catalog
/// and never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub key: String,
    pub name: String,
    pub description: String,
    pub council_size: u32,
    pub enable_cross_review: bool,
    pub verification_mode: VerificationMode,
    pub use_roles: bool,
    pub use_chairman: bool,
    pub samples_per_query: u32,
}

impl BaselineConfig {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            council_size: 3,
            enable_cross_review: true,
            verification_mode: VerificationMode::Consistency,
            use_roles: true,
            use_chairman: true,
            samples_per_query: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_council_size(mut self, size: u32) -> Self {
        self.council_size = size.max(1);
        self
    }

    pub fn with_cross_review(mut self, enabled: bool) -> Self {
        self.enable_cross_review = enabled;
        self
    }

    pub fn with_verification(mut self, mode: VerificationMode) -> Self {
        self.verification_mode = mode;
        self
    }

    pub fn with_chairman(mut self, enabled: bool) -> Self {
        self.use_chairman = enabled;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples_per_query = samples.max(1);
        self
    }

    pub fn is_self_consistency(&self) -> bool {
        self.samples_per_query > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = BaselineConfig::new("full", "Council Full");
        assert_eq!(config.council_size, 3);
        assert!(config.enable_cross_review);
        assert_eq!(config.verification_mode, VerificationMode::Consistency);
        assert_eq!(config.samples_per_query, 1);
        assert!(!config.is_self_consistency());
    }

    #[test]
    fn test_positive_integers_clamped() {
        let config = BaselineConfig::new("x", "X")
            .with_council_size(0)
            .with_samples(0);
        assert_eq!(config.council_size, 1);
        assert_eq!(config.samples_per_query, 1);
    }

    #[test]
    fn test_self_consistency_detection() {
        let config = BaselineConfig::new("sc", "SC").with_samples(3);
        assert!(config.is_self_consistency());
    }

    #[test]
    fn test_verification_mode_wire_names() {
        assert_eq!(VerificationMode::Off.as_str(), "off");
        assert_eq!(VerificationMode::Consistency.to_string(), "consistency");
        let json = serde_json::to_string(&VerificationMode::Evidence).unwrap();
        assert_eq!(json, "\"evidence\"");
    }
}
