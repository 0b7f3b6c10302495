// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: synthetic pages and stand-in OCR engines.
//
// Real OCR needs model files, so tests use pages whose four corners are
// painted in distinct colours and a recognizer that "reads" the dominant
// colour of a crop as the phrase belonging to that corner. Rotating the page
// moves the colours, so orientation handling is exercised end to end.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fitcheck_core::error::{FitcheckError, Result};
use fitcheck_core::{Region, ScanConfig};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::scan::ocr::{RecognizerFactory, TextRecognizer};

pub const PAGE_WIDTH: u32 = 120;
pub const PAGE_HEIGHT: u32 = 180;

const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);
const GREEN: Rgba<u8> = Rgba([30, 200, 30, 255]);
const BLUE: Rgba<u8> = Rgba([30, 30, 200, 255]);
const YELLOW: Rgba<u8> = Rgba([200, 200, 30, 255]);
const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// The text the colour-coded recognizer reports for each corner.
pub fn phrase(region: Region) -> &'static str {
    match region {
        Region::TopLeft => "STATEMENT OF FITNESS FOR WORK",
        Region::TopRight => "SOCIAL SECURITY AND STATUTORY SICK PAY",
        Region::BaseLeft => "DOCTORS SIGNATURE",
        Region::BaseRight => "DATE OF STATEMENT",
    }
}

/// One phrase per corner, thresholds far enough apart that a wrong corner
/// can never pass for a right one.
pub fn test_config() -> ScanConfig {
    ScanConfig {
        top_left_text: vec![phrase(Region::TopLeft).into()],
        top_right_text: vec![phrase(Region::TopRight).into()],
        base_left_text: vec![phrase(Region::BaseLeft).into()],
        base_right_text: vec![phrase(Region::BaseRight).into()],
        high_target: 80,
        diagonal_target: 50,
        shutdown_grace_ms: 2000,
        ..ScanConfig::default()
    }
}

fn colour(region: Region) -> Rgba<u8> {
    match region {
        Region::TopLeft => RED,
        Region::TopRight => GREEN,
        Region::BaseLeft => BLUE,
        Region::BaseRight => YELLOW,
    }
}

fn paint_quadrant(canvas: &mut RgbaImage, region: Region) {
    let (half_w, half_h) = (PAGE_WIDTH / 2, PAGE_HEIGHT / 2);
    let x = if region.is_left() { 0 } else { half_w };
    let y = if region.is_top() { 0 } else { half_h };
    draw_filled_rect_mut(
        canvas,
        Rect::at(x as i32, y as i32).of_size(half_w, half_h),
        colour(region),
    );
}

/// Upright page where only the given corners are readable.
pub fn page_with(regions: &[Region]) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, GREY);
    for region in regions {
        paint_quadrant(&mut canvas, *region);
    }
    DynamicImage::ImageRgba8(canvas)
}

/// Upright page with all four corners readable.
pub fn quadrant_page() -> DynamicImage {
    page_with(&Region::ALL)
}

/// Upright page where only the top-left corner is readable.
pub fn top_left_only_page() -> DynamicImage {
    page_with(&[Region::TopLeft])
}

/// Featureless page of one grey level.
pub fn blank_page(level: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PAGE_WIDTH,
        PAGE_HEIGHT,
        Rgba([level, level, level, 255]),
    ))
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// The corner whose colour dominates `image`, if any.
fn dominant_region(image: &DynamicImage) -> Option<Region> {
    let rgb = image.to_rgb8();
    let count = u64::from(rgb.width()) * u64::from(rgb.height());
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        for (sum, sample) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(sample);
        }
    }
    let [r, g, b] = sums.map(|sum| (sum / count) as i64);
    let dominates = |a: i64, over: i64| a > over + 60;

    if dominates(r, b) && dominates(g, b) {
        Some(Region::BaseRight)
    } else if dominates(r, g) && dominates(r, b) {
        Some(Region::TopLeft)
    } else if dominates(g, r) && dominates(g, b) {
        Some(Region::TopRight)
    } else if dominates(b, r) && dominates(b, g) {
        Some(Region::BaseLeft)
    } else {
        None
    }
}

/// Reads corner colours as corner phrases and counts its calls.
///
/// The first `fast_calls` calls return at once; every later call sleeps for
/// `delay` before answering, whatever the cancellation state.
#[derive(Debug, Default)]
pub struct ColourCodedRecognizer {
    calls: Arc<AtomicUsize>,
    made: usize,
    fast_calls: usize,
    delay: Duration,
}

impl ColourCodedRecognizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ColourCodedRecognizer {
    fn recognize_text(&mut self, image: &DynamicImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.made += 1;
        if self.made > self.fast_calls && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(dominant_region(image).map(phrase).unwrap_or_default().to_string())
    }
}

/// Hands out [`ColourCodedRecognizer`]s that share one call counter.
#[derive(Debug, Default)]
pub struct ColourCodedFactory {
    calls: Arc<AtomicUsize>,
    fast_calls: usize,
    delay: Duration,
}

impl ColourCodedFactory {
    /// Each recognizer answers its first `fast_calls` calls at once and
    /// sleeps for `delay` on every call after that.
    pub fn slow_after(fast_calls: usize, delay: Duration) -> Self {
        Self {
            calls: Arc::default(),
            fast_calls,
            delay,
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl RecognizerFactory for ColourCodedFactory {
    fn create(&self) -> Result<Box<dyn TextRecognizer>> {
        Ok(Box::new(ColourCodedRecognizer {
            calls: Arc::clone(&self.calls),
            made: 0,
            fast_calls: self.fast_calls,
            delay: self.delay,
        }))
    }
}

/// Fails the first `failures` engine creations, then behaves like
/// [`ColourCodedFactory`].
#[derive(Debug)]
pub struct FailingFactory {
    failures: usize,
    created: AtomicUsize,
    inner: ColourCodedFactory,
}

impl FailingFactory {
    pub fn always() -> Self {
        Self::first(usize::MAX)
    }

    pub fn first(failures: usize) -> Self {
        Self {
            failures,
            created: AtomicUsize::new(0),
            inner: ColourCodedFactory::default(),
        }
    }
}

impl RecognizerFactory for FailingFactory {
    fn create(&self) -> Result<Box<dyn TextRecognizer>> {
        if self.created.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(FitcheckError::EngineInitialization("model data missing".into()));
        }
        self.inner.create()
    }
}

#[test]
fn fixtures_decode_to_their_own_corner() {
    let page = quadrant_page();
    for region in Region::ALL {
        let crop = crate::filters::crop_anchor(&page, region, 6);
        assert_eq!(dominant_region(&crop), Some(region));
    }
    assert_eq!(dominant_region(&blank_page(0)), None);
}
