//! Mapping from the shared TOML config to tagging rules

use crate::consensus::{DisagreementThreshold, TagRules};
use crate::error::{TagError, TagResult};
use crate::models::BooleanLiterals;
use psi_common::config::TaggingConfig;

impl TagRules {
    /// Build rules from the `[tagging]` section
    ///
    /// # Errors
    /// [`TagError::InvalidSetting`] for an unrecognized threshold name.
    pub fn from_config(config: &TaggingConfig) -> TagResult<Self> {
        let threshold = DisagreementThreshold::parse(&config.disagreement_threshold).ok_or_else(|| {
            TagError::InvalidSetting(format!(
                "disagreement_threshold must be \"strict\" or \"lenient\", got \"{}\"",
                config.disagreement_threshold
            ))
        })?;

        let boolean_literals = if config.legacy_boolean_literals {
            BooleanLiterals::TrueOnly
        } else {
            BooleanLiterals::TrueAndFalse
        };

        Ok(Self {
            threshold,
            boolean_literals,
        })
    }
}
