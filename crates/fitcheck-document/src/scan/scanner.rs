// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region-filter scanner — scans the four anchor regions of one oriented page
// image, trying a sequence of filters per region against the OCR engine and
// feeding the best fuzzy scores into a `ClassifierState`.
//
// OCR calls dominate the cost, so the scanner stops as early as it can: per
// region once the pass threshold is met or the region looks hopeless, and
// across regions once the verdict is settled.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fitcheck_core::error::{FitcheckError, Result};
use fitcheck_core::{Region, ScanConfig, Verdict};
use image::DynamicImage;
use tracing::{debug, trace};

use super::classifier::{ClassifierState, truncate_chars};
use super::fuzzy::fuzzy_string_contains;
use super::ocr::TextRecognizer;
use crate::filters::{crop_anchor, grayscale, increase_contrast, normalize_brightness};

/// Filter index after which a region scoring below the diagonal target is
/// abandoned.
const EARLY_ABANDON_AFTER: usize = 1;

/// Shared cancellation signal for a group of rotation attempts.
///
/// Cloning shares the flag. Scanners check it before every OCR call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FitcheckError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One way of preparing an anchor crop for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFilter {
    /// Brightness normalised toward the configured target.
    Brightness,
    /// The crop as-is.
    Unfiltered,
    /// Binarized at the configured cut-off.
    Contrast,
    /// Converted to grayscale, then binarized.
    GrayscaleContrast,
}

impl RegionFilter {
    /// The order filters are tried in for every region.
    pub const SEQUENCE: [RegionFilter; 4] = [
        RegionFilter::Brightness,
        RegionFilter::Unfiltered,
        RegionFilter::Contrast,
        RegionFilter::GrayscaleContrast,
    ];

    pub fn apply<'a>(self, crop: &'a DynamicImage, config: &ScanConfig) -> Cow<'a, DynamicImage> {
        match self {
            Self::Brightness => Cow::Owned(normalize_brightness(
                crop,
                config.target_brightness,
                config.border_loss_percentage,
            )),
            Self::Unfiltered => Cow::Borrowed(crop),
            Self::Contrast => Cow::Owned(increase_contrast(crop, config.contrast_cut_off)),
            Self::GrayscaleContrast => {
                Cow::Owned(increase_contrast(&grayscale(crop), config.contrast_cut_off))
            }
        }
    }
}

/// Best fuzzy score of `text` against any of `phrases`.
pub fn best_phrase_score(text: &str, phrases: &[String]) -> Result<u8> {
    if text.trim().is_empty() {
        return Ok(0);
    }
    let mut best = 0;
    for phrase in phrases {
        best = best.max(fuzzy_string_contains(text, phrase)?);
    }
    Ok(best)
}

/// Drives one OCR engine over the anchor regions of one page image.
pub struct RegionScanner<'a> {
    config: &'a ScanConfig,
    recognizer: &'a mut dyn TextRecognizer,
    cancel: &'a CancelFlag,
}

impl<'a> RegionScanner<'a> {
    pub fn new(
        config: &'a ScanConfig,
        recognizer: &'a mut dyn TextRecognizer,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            config,
            recognizer,
            cancel,
        }
    }

    /// Scan `image` and leave the final verdict in `state`.
    ///
    /// Order: top-left first. A weak top-left rules out its diagonal, so
    /// base-right is skipped. Otherwise base-right is scanned with the
    /// diagonal target as its pass mark when top-left is already strong.
    /// Base-left follows, and top-right only if base-left could still pair
    /// with it. Scanning stops as soon as the verdict is `SUCCESS`.
    ///
    /// # Errors
    ///
    /// OCR failures and [`FitcheckError::Cancelled`] are returned as-is; the
    /// caller decides what they mean for the attempt.
    pub fn scan(&mut self, image: &DynamicImage, state: &mut ClassifierState) -> Result<Verdict> {
        state.reset();
        let high = state.high_target();
        let diagonal = state.diagonal_target();

        let top_left = self.scan_region(image, Region::TopLeft, high, state)?;
        if top_left >= diagonal {
            let threshold = if top_left >= high { diagonal } else { high };
            self.scan_region(image, Region::BaseRight, threshold, state)?;
            if state.classify() == Verdict::Success {
                return Ok(Verdict::Success);
            }
        } else {
            debug!(top_left, "Top-left too weak for a diagonal, skipping base-right");
        }

        let base_left = self.scan_region(image, Region::BaseLeft, high, state)?;
        if state.classify() == Verdict::Success {
            return Ok(Verdict::Success);
        }
        if base_left < diagonal {
            debug!(base_left, "Base-left too weak, skipping top-right");
            return Ok(state.verdict());
        }

        let threshold = if base_left >= high { diagonal } else { high };
        self.scan_region(image, Region::TopRight, threshold, state)?;
        Ok(state.classify())
    }

    /// Try each filter on one region until its best score reaches
    /// `pass_threshold`, the region is abandoned, or filters run out.
    /// Returns the region's best score.
    pub fn scan_region(
        &mut self,
        image: &DynamicImage,
        region: Region,
        pass_threshold: u8,
        state: &mut ClassifierState,
    ) -> Result<u8> {
        let crop = crop_anchor(image, region, self.config.vertical_slices);

        for (attempt, filter) in RegionFilter::SEQUENCE.into_iter().enumerate() {
            self.cancel.check()?;

            let candidate = filter.apply(&crop, self.config);
            let text = self.recognizer.recognize_text(&candidate)?.to_uppercase();
            let score = best_phrase_score(&text, state.target(region).phrases())?;
            state.target_mut(region).setup_percentage(score, &text);

            let best = state.percentage(region);
            trace!(
                %region,
                ?filter,
                score,
                best,
                text = %truncate_chars(&text, self.config.max_log_chars),
                "Region OCR pass"
            );

            if best >= pass_threshold {
                break;
            }
            if attempt == EARLY_ABANDON_AFTER && best < state.diagonal_target() {
                debug!(%region, best, "Region abandoned after two filters");
                break;
            }
        }

        let best = state.percentage(region);
        debug!(%region, best, pass_threshold, "Region scanned");
        Ok(best)
    }
}
