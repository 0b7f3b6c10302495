// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format classifier — accumulates the best fuzzy match per anchor region and
// turns the four scores into a verdict.
//
// A `ClassifierState` belongs to exactly one rotation attempt and is never
// shared across threads while scanning is in progress.

use fitcheck_core::{Region, RegionMap, RegionReport, ScanConfig, Verdict};
use image::DynamicImage;
use tracing::debug;

use super::fuzzy::PERFECT_MATCH;

/// Phrase variants for one anchor region, plus the best score seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    region: Region,
    phrases: Vec<String>,
    percentage: u8,
    best_text: String,
}

impl ScanTarget {
    pub fn new(region: Region, phrases: Vec<String>) -> Self {
        Self {
            region,
            phrases,
            percentage: 0,
            best_text: String::new(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Best percentage recorded during the current pass.
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    /// Recognised text that produced [`percentage`](Self::percentage).
    pub fn best_text(&self) -> &str {
        &self.best_text
    }

    /// Record a score. Only raises the stored percentage; returns whether it
    /// did.
    pub fn setup_percentage(&mut self, percentage: u8, text: &str) -> bool {
        let percentage = percentage.min(PERFECT_MATCH);
        if percentage > self.percentage {
            self.percentage = percentage;
            self.best_text = text.to_string();
            return true;
        }
        // Keep whatever was read for diagnostics, even when nothing matched.
        if self.best_text.is_empty() {
            self.best_text = text.to_string();
        }
        false
    }

    /// Forget all scores, ready for a new pass.
    pub fn reset(&mut self) {
        self.percentage = 0;
        self.best_text.clear();
    }
}

/// Per-rotation classification state: four scan targets, the working image,
/// and the current verdict.
#[derive(Debug, Clone)]
pub struct ClassifierState {
    targets: RegionMap<ScanTarget>,
    image: Option<DynamicImage>,
    verdict: Verdict,
    high_target: u8,
    diagonal_target: u8,
}

impl ClassifierState {
    /// Build a fresh state from the configured phrases and thresholds.
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            targets: RegionMap::from_fn(|region| {
                ScanTarget::new(region, config.phrases(region).to_vec())
            }),
            image: None,
            verdict: Verdict::Initialised,
            high_target: config.high_target,
            diagonal_target: config.diagonal_target,
        }
    }

    pub fn high_target(&self) -> u8 {
        self.high_target
    }

    pub fn diagonal_target(&self) -> u8 {
        self.diagonal_target
    }

    pub fn target(&self, region: Region) -> &ScanTarget {
        self.targets.get(region)
    }

    pub fn target_mut(&mut self, region: Region) -> &mut ScanTarget {
        self.targets.get_mut(region)
    }

    pub fn percentage(&self, region: Region) -> u8 {
        self.targets.get(region).percentage()
    }

    /// The verdict as of the last [`classify`](Self::classify) call.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The accepted page image, attached on success.
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
    }

    pub fn take_image(&mut self) -> Option<DynamicImage> {
        self.image.take()
    }

    /// Start a new classification pass.
    pub fn reset(&mut self) {
        for region in Region::ALL {
            self.targets.get_mut(region).reset();
        }
        self.image = None;
        self.verdict = Verdict::Initialised;
    }

    /// Force the verdict to `FAILED`, keeping the scores for diagnostics.
    pub fn mark_failed(&mut self) {
        self.verdict = Verdict::Failed;
    }

    fn is_strong(&self, region: Region) -> bool {
        self.percentage(region) >= self.high_target
    }

    fn is_moderate(&self, region: Region) -> bool {
        self.percentage(region) >= self.diagonal_target
    }

    /// Recompute the verdict from the current scores.
    ///
    /// `FAILED` when no region reaches the high target. `SUCCESS` when a
    /// strong region's diagonal partner reaches the diagonal target, or when
    /// both top regions are strong. `PARTIAL` otherwise.
    pub fn classify(&mut self) -> Verdict {
        let strong_count = Region::ALL.iter().filter(|r| self.is_strong(**r)).count();

        let diagonal_match = Region::ALL
            .iter()
            .any(|r| self.is_strong(*r) && self.is_moderate(r.diagonal()));
        let top_match = self.is_strong(Region::TopLeft) && self.is_strong(Region::TopRight);

        self.verdict = if strong_count == 0 {
            Verdict::Failed
        } else if diagonal_match || top_match {
            Verdict::Success
        } else {
            Verdict::Partial
        };

        debug!(
            top_left = self.percentage(Region::TopLeft),
            top_right = self.percentage(Region::TopRight),
            base_left = self.percentage(Region::BaseLeft),
            base_right = self.percentage(Region::BaseRight),
            verdict = %self.verdict,
            "Classified"
        );
        self.verdict
    }

    /// Per-region diagnostics with the matched text cut to `max_chars`.
    pub fn reports(&self, max_chars: usize) -> Vec<RegionReport> {
        self.targets
            .iter()
            .map(|(region, target)| RegionReport {
                region,
                percentage: target.percentage(),
                snippet: truncate_chars(target.best_text(), max_chars),
            })
            .collect()
    }
}

/// First `max_chars` characters of `text`, whitespace collapsed.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}
