// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fitcheck-document — OCR validation engine for scanned fit notes.
//
// Provides pixel filters (grayscale, brightness normalisation, contrast
// binarization), fuzzy phrase matching tolerant of OCR noise, a four-corner
// format classifier, and a rotation race that finds the page's orientation by
// scanning all four hypotheses at once.

pub mod filters;
pub mod scan;
pub mod validator;

#[cfg(test)]
mod test_support;

// Re-export the primary types so callers can use `fitcheck_document::DocumentValidator` etc.
pub use scan::{ClassifierState, OcrConfig, RecognizerFactory, RotationRace, TextRecognizer};
pub use validator::{DocumentValidator, ValidationReport};

#[cfg(feature = "ocr")]
pub use scan::OcrsFactory;
