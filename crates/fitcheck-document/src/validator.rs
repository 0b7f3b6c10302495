// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document validator — the caller-facing entry point. Decodes a submitted
// image, runs the rotation race, and summarises the outcome as a
// `ValidationReport`, including the re-oriented page on success.

use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use fitcheck_core::error::{FitcheckError, Result};
use fitcheck_core::{Region, RegionReport, Rotation, ScanConfig, SessionId, Verdict};
use image::DynamicImage;
use serde::Serialize;
use tracing::{info, instrument};

use crate::filters::{decode, encode_jpeg};
use crate::scan::ocr::RecognizerFactory;
use crate::scan::rotation::{RotationOutcome, RotationRace};

/// Quality of the corrected page handed back on success.
const CORRECTED_JPEG_QUALITY: u8 = 85;

/// Result of validating one submitted image.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub session_id: SessionId,
    pub verdict: Verdict,
    /// Orientation under which the page was recognised, if any.
    pub rotation: Option<Rotation>,
    pub regions: Vec<RegionReport>,
    pub checked_at: DateTime<Utc>,
    /// The page turned upright, as JPEG. Only present on `SUCCESS`.
    #[serde(skip)]
    pub corrected_image: Option<Vec<u8>>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }

    fn unreadable(session_id: SessionId) -> Self {
        Self {
            session_id,
            verdict: Verdict::Failed,
            rotation: None,
            regions: Region::ALL
                .into_iter()
                .map(|region| RegionReport {
                    region,
                    percentage: 0,
                    snippet: String::new(),
                })
                .collect(),
            checked_at: Utc::now(),
            corrected_image: None,
        }
    }
}

/// Checks submitted images against the configured fit note layout.
#[derive(Clone)]
pub struct DocumentValidator {
    config: Arc<ScanConfig>,
    race: RotationRace,
}

impl DocumentValidator {
    /// # Errors
    ///
    /// [`FitcheckError::Config`] if `config` fails validation.
    pub fn new(config: ScanConfig, factory: Arc<dyn RecognizerFactory>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            race: RotationRace::new(Arc::clone(&config), factory),
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Validate a base64 payload. A `data:image/...;base64,` prefix is
    /// accepted and ignored.
    pub async fn validate_base64(
        &self,
        payload: &str,
        session_id: SessionId,
    ) -> Result<ValidationReport> {
        let payload = payload.trim();
        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(',')
                .map(|(_, data)| data)
                .ok_or_else(|| FitcheckError::Decode("data URI has no payload".into()))?,
            None => payload,
        };
        if encoded.is_empty() {
            return Err(FitcheckError::Decode("image payload is empty".into()));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| FitcheckError::Decode(format!("invalid base64 payload: {}", err)))?;
        self.validate_bytes(&bytes, session_id).await
    }

    /// Validate encoded image bytes (JPEG, PNG, etc.).
    ///
    /// # Errors
    ///
    /// [`FitcheckError::Decode`] for undecodable bytes, before any scanning.
    pub async fn validate_bytes(
        &self,
        data: &[u8],
        session_id: SessionId,
    ) -> Result<ValidationReport> {
        let image = decode(data)?;
        self.validate_image(&image, session_id).await
    }

    /// Validate an already decoded image.
    ///
    /// # Errors
    ///
    /// Only configuration-class failures, such as an OCR engine that cannot
    /// load its models, are returned as errors. Unreadable pages produce a
    /// `FAILED` report.
    #[instrument(
        skip_all,
        fields(session = %session_id, width = image.width(), height = image.height())
    )]
    pub async fn validate_image(
        &self,
        image: &DynamicImage,
        session_id: SessionId,
    ) -> Result<ValidationReport> {
        let report = match self.race.try_rotations(image, session_id).await? {
            Some(outcome) => self.report(outcome, session_id)?,
            None => ValidationReport::unreadable(session_id),
        };

        info!(verdict = %report.verdict, rotation = ?report.rotation, "Validation complete");
        Ok(report)
    }

    fn report(
        &self,
        mut outcome: RotationOutcome,
        session_id: SessionId,
    ) -> Result<ValidationReport> {
        let verdict = outcome.verdict();
        let corrected_image = match outcome.state.take_image() {
            Some(page) if verdict == Verdict::Success => {
                Some(encode_jpeg(&page, CORRECTED_JPEG_QUALITY)?)
            }
            _ => None,
        };

        Ok(ValidationReport {
            session_id,
            verdict,
            rotation: Some(outcome.rotation),
            regions: outcome.state.reports(self.config.max_log_chars),
            checked_at: Utc::now(),
            corrected_image,
        })
    }
}
