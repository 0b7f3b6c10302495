// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine seam for the region scanner.
//
// The scanner only talks to a `TextRecognizer`. Engines are not assumed to be
// thread-safe, so every rotation attempt asks a `RecognizerFactory` for its
// own instance and drops it when the attempt ends, whichever way it ends.
//
// # Feature Gate
//
// The production engine wraps `ocrs`, a pure-Rust OCR engine backed by
// neural network models executed via `rten`. It is only compiled with the
// `ocr` feature:
//
// ```toml
// fitcheck-document = { path = "crates/fitcheck-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) — locates text in the crop.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Running the `ocrs-cli` tool once downloads them to `~/.cache/ocrs/`, which
// is the default model directory.

use std::path::{Path, PathBuf};

use fitcheck_core::error::{FitcheckError, Result};
use image::DynamicImage;

/// Anything that can turn an image into text.
pub trait TextRecognizer: Send {
    /// Recognise all text in `image`. Blocking; may take hundreds of
    /// milliseconds.
    fn recognize_text(&mut self, image: &DynamicImage) -> Result<String>;
}

/// Builds one [`TextRecognizer`] per rotation attempt.
pub trait RecognizerFactory: Send + Sync {
    /// Construct and initialise an engine.
    ///
    /// # Errors
    ///
    /// [`FitcheckError::EngineInitialization`] when model data cannot be
    /// loaded. This is a configuration problem, not a scan failure.
    fn create(&self) -> Result<Box<dyn TextRecognizer>>;
}

/// Default directory for cached OCR model files.
///
/// Follows the XDG Base Directory specification: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Where to find the OCR engine's model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects the directory to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(FitcheckError::EngineInitialization(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "ocr")]
pub use engine::{OcrsFactory, OcrsRecognizer};

#[cfg(feature = "ocr")]
mod engine {
    use fitcheck_core::error::{FitcheckError, Result};
    use image::DynamicImage;
    use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
    use rten::Model;
    use tracing::{debug, info, instrument};

    use super::{OcrConfig, RecognizerFactory, TextRecognizer};

    /// `ocrs`-backed recognizer. Owns its models; dropped with its attempt.
    pub struct OcrsRecognizer {
        engine: OcrEngine,
    }

    impl OcrsRecognizer {
        /// Load both models and initialise the engine.
        ///
        /// Model loading is the expensive step. The `ocrs` and `rten` crates
        /// must be compiled in release mode; debug builds are 10-100x slower.
        #[instrument(skip_all, fields(
            detection = %config.detection_model_path.display(),
            recognition = %config.recognition_model_path.display(),
        ))]
        pub fn new(config: &OcrConfig) -> Result<Self> {
            config.validate()?;

            let load = |path: &std::path::Path| {
                Model::load_file(path).map_err(|err| {
                    FitcheckError::EngineInitialization(format!(
                        "failed to load model from {}: {}",
                        path.display(),
                        err
                    ))
                })
            };
            let detection_model = load(&config.detection_model_path)?;
            let recognition_model = load(&config.recognition_model_path)?;

            let engine = OcrEngine::new(OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|err| {
                FitcheckError::EngineInitialization(format!(
                    "failed to initialise OCR engine: {}",
                    err
                ))
            })?;

            info!("OCR engine initialised");
            Ok(Self { engine })
        }
    }

    impl TextRecognizer for OcrsRecognizer {
        fn recognize_text(&mut self, image: &DynamicImage) -> Result<String> {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();

            let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
                FitcheckError::Ocr(format!(
                    "failed to create image source ({}x{}): {}",
                    width, height, err
                ))
            })?;
            let input = self
                .engine
                .prepare_input(source)
                .map_err(|err| FitcheckError::Ocr(format!("OCR preprocessing failed: {}", err)))?;
            let text = self.engine.get_text(&input).map_err(|err| {
                FitcheckError::Ocr(format!("OCR text recognition failed: {}", err))
            })?;

            debug!(width, height, char_count = text.len(), "OCR recognition complete");
            Ok(text)
        }
    }

    /// Builds a fresh [`OcrsRecognizer`] from the same model files each time.
    #[derive(Debug, Clone, Default)]
    pub struct OcrsFactory {
        config: OcrConfig,
    }

    impl OcrsFactory {
        pub fn new(config: OcrConfig) -> Self {
            Self { config }
        }
    }

    impl RecognizerFactory for OcrsFactory {
        fn create(&self) -> Result<Box<dyn TextRecognizer>> {
            Ok(Box::new(OcrsRecognizer::new(&self.config)?))
        }
    }
}
