// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — fuzzy phrase matching, the four-corner classifier, the
// per-region filter loop, and the rotation race that drives it all through
// an optical character recognition (OCR) engine.

pub mod classifier;
pub mod fuzzy;
pub mod ocr;
pub mod rotation;
pub mod scanner;

pub use classifier::{ClassifierState, ScanTarget};
pub use fuzzy::{fuzzy_string_contains, fuzzy_string_valid, replace_invalid_characters};
pub use ocr::{OcrConfig, RecognizerFactory, TextRecognizer};
pub use rotation::{RotationOutcome, RotationRace};
pub use scanner::{CancelFlag, RegionFilter, RegionScanner};

#[cfg(feature = "ocr")]
pub use ocr::{OcrsFactory, OcrsRecognizer};
