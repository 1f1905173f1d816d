/// Generator configuration, loaded from RON. Every field is optional and
/// falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::catalog::SourcePriority;
use crate::core::matcher::MatcherConfig;
use crate::core::synthesizer::FieldTypeTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid thresholds: suggestion {suggestion} and auto-accept {auto_accept} must lie in 0..=1 with suggestion <= auto-accept")]
    Thresholds { suggestion: f64, auto_accept: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub matcher: MatcherConfig,
    pub npc_priority: SourcePriority,
    pub item_priority: SourcePriority,
    /// Field types for overrides that create new fields. Replaces the
    /// built-in table when given.
    pub field_types: FieldTypeTable,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            npc_priority: SourcePriority::npcs(),
            item_priority: SourcePriority::items(),
            field_types: FieldTypeTable::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_ron(path: &Path) -> Result<GeneratorConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GeneratorConfig, ConfigError> {
        let config: GeneratorConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matcher;
        let in_range = |t: f64| (0.0..=1.0).contains(&t);
        if !in_range(m.suggestion_threshold)
            || !in_range(m.auto_accept_threshold)
            || m.suggestion_threshold > m.auto_accept_threshold
        {
            return Err(ConfigError::Thresholds {
                suggestion: m.suggestion_threshold,
                auto_accept: m.auto_accept_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldType;

    #[test]
    fn empty_config_uses_defaults() {
        let config = GeneratorConfig::parse_ron("()").unwrap();
        assert_eq!(config.matcher, MatcherConfig::default());
        assert_eq!(config.npc_priority, SourcePriority::npcs());
        assert_eq!(config.item_priority, SourcePriority::items());
        assert_eq!(config.field_types.infer("hits"), FieldType::Number);
    }

    #[test]
    fn partial_matcher_section() {
        let config = GeneratorConfig::parse_ron("(matcher: (default_level: 3, auto_accept_threshold: 0.85))").unwrap();
        assert_eq!(config.matcher.default_level, 3);
        assert_eq!(config.matcher.auto_accept_threshold, 0.85);
        assert_eq!(config.matcher.suggestion_threshold, 0.80);
        assert_eq!(config.matcher.max_suggestions, 5);
    }

    #[test]
    fn priority_and_field_types() {
        let config = GeneratorConfig::parse_ron(
            r#"(
                npc_priority: ["Creatures & Treasures", "Character Law"],
                field_types: { "motto": FormattedText },
            )"#,
        )
        .unwrap();
        assert_eq!(config.npc_priority.rank("Creatures & Treasures"), 1);
        assert_eq!(config.item_priority, SourcePriority::items());
        assert_eq!(config.field_types.infer("motto"), FieldType::FormattedText);
        // replaced, not merged
        assert_eq!(config.field_types.infer("hits"), FieldType::String);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = GeneratorConfig::parse_ron("(matcher: (suggestion_threshold: 0.95))").unwrap_err();
        assert!(matches!(err, ConfigError::Thresholds { .. }));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let err = GeneratorConfig::parse_ron("(matcher: (auto_accept_threshold: 1.5))").unwrap_err();
        assert!(matches!(err, ConfigError::Thresholds { .. }));
    }

    #[test]
    fn load_test_config() {
        let config = GeneratorConfig::load_from_ron(Path::new("tests/fixtures/config.ron")).unwrap();
        assert_eq!(config.matcher.default_level, 5);
    }
}
