// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic classical resampling, the always-available fallback.

use etdxforge_core::ScaleFactor;
use image::imageops::FilterType;
use image::DynamicImage;

/// Enlarge by the given scale factor with Lanczos3.
pub fn resize(image: &DynamicImage, factor: ScaleFactor) -> DynamicImage {
    let m = factor.multiplier();
    resize_to(image, image.width() * m, image.height() * m)
}

/// Resize to exact target dimensions with Lanczos3.
pub fn resize_to(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3)
}
