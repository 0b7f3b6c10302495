// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validator configuration: anchor phrases, scoring thresholds, and filter
// parameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FitcheckError, Result};
use crate::types::Region;

/// Settings that drive one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Acceptable phrase variants printed in the top-left corner.
    pub top_left_text: Vec<String>,
    /// Acceptable phrase variants printed in the top-right corner.
    pub top_right_text: Vec<String>,
    /// Acceptable phrase variants printed in the bottom-left corner.
    pub base_left_text: Vec<String>,
    /// Acceptable phrase variants printed in the bottom-right corner.
    pub base_right_text: Vec<String>,
    /// Percentage at or above which a region counts as a strong match.
    pub high_target: u8,
    /// Lower percentage sufficient when the diagonally opposite region is strong.
    pub diagonal_target: u8,
    /// Samples below this value become black when binarizing.
    pub contrast_cut_off: u8,
    /// Mean sample value that brightness normalisation aims for.
    pub target_brightness: u8,
    /// Border excluded from the brightness measurement, as a divisor of each
    /// dimension. `0` measures the whole image.
    pub border_loss_percentage: u32,
    /// The anchor strips are `height / vertical_slices` tall.
    pub vertical_slices: u32,
    /// Recognised text is truncated to this many characters in logs and reports.
    pub max_log_chars: usize,
    /// How long the rotation race waits for losing attempts to wind down.
    pub shutdown_grace_ms: u64,
    /// Directory holding the OCR engine's model files.
    pub model_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            top_left_text: vec![
                "Statement of Fitness for Work".into(),
                "Fitness for Work".into(),
            ],
            top_right_text: vec![
                "for social security or Statutory Sick Pay".into(),
                "Statutory Sick Pay".into(),
            ],
            base_left_text: vec!["Doctor's signature".into(), "Doctors signature".into()],
            base_right_text: vec!["Date of statement".into()],
            high_target: 80,
            diagonal_target: 40,
            contrast_cut_off: 105,
            target_brightness: 179,
            border_loss_percentage: 10,
            vertical_slices: 6,
            max_log_chars: 50,
            shutdown_grace_ms: 1000,
            model_dir: None,
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// The phrase variants configured for `region`.
    pub fn phrases(&self, region: Region) -> &[String] {
        match region {
            Region::TopLeft => &self.top_left_text,
            Region::TopRight => &self.top_right_text,
            Region::BaseLeft => &self.base_left_text,
            Region::BaseRight => &self.base_right_text,
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        for region in Region::ALL {
            let phrases = self.phrases(region);
            if phrases.is_empty() {
                return Err(FitcheckError::Config(format!(
                    "no phrases configured for {region}"
                )));
            }
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(FitcheckError::Config(format!(
                    "empty phrase configured for {region}"
                )));
            }
        }
        if self.high_target > 100 || self.diagonal_target > 100 {
            return Err(FitcheckError::Config(format!(
                "targets must be percentages, got high={} diagonal={}",
                self.high_target, self.diagonal_target
            )));
        }
        if self.diagonal_target > self.high_target {
            return Err(FitcheckError::Config(format!(
                "diagonal_target ({}) must not exceed high_target ({})",
                self.diagonal_target, self.high_target
            )));
        }
        if self.vertical_slices < 2 {
            return Err(FitcheckError::Config(format!(
                "vertical_slices must be at least 2, got {}",
                self.vertical_slices
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        ScanConfig::default().validate().unwrap();
    }

    #[test]
    fn diagonal_above_high_is_rejected() {
        let config = ScanConfig {
            high_target: 50,
            diagonal_target: 60,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FitcheckError::Config(_))));
    }

    #[test]
    fn empty_phrase_list_is_rejected() {
        let config = ScanConfig {
            base_right_text: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BASE_RIGHT"), "got {err}");
    }

    #[test]
    fn single_slice_is_rejected() {
        let config = ScanConfig {
            vertical_slices: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "high_target": 90, "top_left_text": ["FIT NOTE"] }}"#).unwrap();

        let config = ScanConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.high_target, 90);
        assert_eq!(config.phrases(Region::TopLeft), ["FIT NOTE".to_string()]);
        assert_eq!(config.vertical_slices, 6);
    }

    #[test]
    fn invalid_json_file_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ScanConfig::from_json_file(file.path()),
            Err(FitcheckError::Serialization(_))
        ));
    }
}
