// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for fitcheck.

use thiserror::Error;

/// Top-level error type for all fitcheck operations.
#[derive(Debug, Error)]
pub enum FitcheckError {
    // -- Matching errors --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Engine errors --
    #[error("OCR engine could not be initialised: {0}")]
    EngineInitialization(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("scan cancelled")]
    Cancelled,

    // -- Image errors --
    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FitcheckError {
    /// Whether this error reflects a systemic misconfiguration rather than
    /// something wrong with one particular image.
    ///
    /// Configuration-class errors are surfaced to the caller in place of a
    /// verdict; everything else degrades to a `FAILED` classification.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::EngineInitialization(_) | Self::Config(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FitcheckError>;
