// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel filters and geometry helpers for the region scanner — grayscale,
// brightness normalisation, contrast binarization, orientation, anchor
// cropping, and decode/encode at the engine boundary.
//
// Every filter is a pure function: the input image is never mutated and a
// new image is returned, so filters can run concurrently on independent
// images.

use fitcheck_core::error::{FitcheckError, Result};
use fitcheck_core::{Region, Rotation};
use image::{DynamicImage, ImageBuffer, Pixel};
use tracing::{debug, instrument};

// -- Filters ------------------------------------------------------------------

/// Convert the image to a single 8-bit luminance channel.
pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(image.to_luma8())
}

/// Rescale every sample so the mean sample value moves toward
/// `target_brightness`.
///
/// The mean is measured with a border of `dimension / border_loss_percent`
/// pixels excluded on each side; `0` measures the whole image. A measured
/// brightness of 0 is treated as 1. Grayscale images stay grayscale, anything
/// else is normalised as 8-bit RGB.
pub fn normalize_brightness(
    image: &DynamicImage,
    target_brightness: u8,
    border_loss_percent: u32,
) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rescale_samples(
            gray,
            target_brightness,
            border_loss_percent,
        )),
        other => DynamicImage::ImageRgb8(rescale_samples(
            &other.to_rgb8(),
            target_brightness,
            border_loss_percent,
        )),
    }
}

/// Binarize: every sample below `cutoff` becomes 0, everything else 255.
pub fn increase_contrast(image: &DynamicImage, cutoff: u8) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(binarize_samples(gray, cutoff)),
        other => DynamicImage::ImageRgb8(binarize_samples(&other.to_rgb8(), cutoff)),
    }
}

/// Mean sample value over the image with the border margin excluded.
pub fn mean_brightness<P>(buffer: &ImageBuffer<P, Vec<u8>>, border_loss_percent: u32) -> u64
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = buffer.dimensions();
    let (mut margin_x, mut margin_y) = match border_loss_percent {
        0 => (0, 0),
        divisor => (width / divisor, height / divisor),
    };
    // Tiny crops would lose everything to the margin; measure them whole.
    if margin_x * 2 >= width || margin_y * 2 >= height {
        margin_x = 0;
        margin_y = 0;
    }

    let mut sum = 0u64;
    let mut count = 0u64;
    for y in margin_y..height - margin_y {
        for x in margin_x..width - margin_x {
            for &sample in buffer.get_pixel(x, y).channels() {
                sum += u64::from(sample);
                count += 1;
            }
        }
    }

    if count == 0 { 0 } else { sum / count }
}

fn rescale_samples<P>(
    buffer: &ImageBuffer<P, Vec<u8>>,
    target_brightness: u8,
    border_loss_percent: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let current = mean_brightness(buffer, border_loss_percent).max(1);
    let factor = f64::from(target_brightness) / current as f64;
    debug!(current, target_brightness, factor, "Normalising brightness");

    let mut output = buffer.clone();
    for pixel in output.pixels_mut() {
        for sample in pixel.channels_mut() {
            *sample = (f64::from(*sample) * factor).round().min(255.0) as u8;
        }
    }
    output
}

fn binarize_samples<P>(buffer: &ImageBuffer<P, Vec<u8>>, cutoff: u8) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut output = buffer.clone();
    for pixel in output.pixels_mut() {
        for sample in pixel.channels_mut() {
            *sample = if *sample < cutoff { 0 } else { 255 };
        }
    }
    output
}

// -- Geometry -----------------------------------------------------------------

/// Rotate the image clockwise by a rotation hypothesis. Lossless.
pub fn orient(image: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Deg0 => image.clone(),
        Rotation::Deg90 => image.rotate90(),
        Rotation::Deg180 => image.rotate180(),
        Rotation::Deg270 => image.rotate270(),
    }
}

/// Pixel rectangle `(x, y, width, height)` of an anchor region.
///
/// Top regions are the strip of height `height / vertical_slices` at the top
/// of the page, base regions the mirrored strip at the bottom; each is split
/// into left and right halves.
pub fn anchor_rect(
    width: u32,
    height: u32,
    region: Region,
    vertical_slices: u32,
) -> (u32, u32, u32, u32) {
    let strip_height = height / vertical_slices.max(1);
    let left_width = width / 2;

    let (x, strip_width) = if region.is_left() {
        (0, left_width)
    } else {
        (left_width, width - left_width)
    };
    let y = if region.is_top() {
        0
    } else {
        height - strip_height
    };

    (x, y, strip_width, strip_height)
}

/// Crop one anchor region out of the (already oriented) page image.
pub fn crop_anchor(image: &DynamicImage, region: Region, vertical_slices: u32) -> DynamicImage {
    let (x, y, width, height) = anchor_rect(image.width(), image.height(), region, vertical_slices);
    image.crop_imm(x, y, width, height)
}

// -- Decode / encode ----------------------------------------------------------

/// Decode raw image bytes (JPEG, PNG, etc.).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)
        .map_err(|err| FitcheckError::Decode(format!("failed to decode image: {}", err)))?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Image decoded from bytes"
    );
    Ok(image)
}

/// Encode the image as JPEG bytes with the given quality (1-100).
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| FitcheckError::Encode(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}
