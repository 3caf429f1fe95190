// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper-size inference from pixel or point dimensions.

use etdxforge_core::PaperSize;

/// Standard sizes in order of commonness; ties resolve to the earlier entry.
const STANDARD_SIZES: &[(PaperSize, f64, f64)] = &[
    (PaperSize::A4, 210.0, 297.0),
    (PaperSize::Letter, 215.9, 279.4),
    (PaperSize::A3, 297.0, 420.0),
    (PaperSize::A5, 148.0, 210.0),
    (PaperSize::Legal, 215.9, 355.6),
    (PaperSize::Tabloid, 279.4, 431.8),
];

/// Maximum per-axis deviation for a standard-size match.
const SIZE_TOLERANCE_MM: f64 = 5.0;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// Convert PDF points to millimetres.
pub fn points_to_mm(points: f64) -> f64 {
    points / POINTS_PER_INCH * MM_PER_INCH
}

/// Infer a paper size from pixel dimensions at the given DPI.
///
/// Total: always returns a size. Dimensions matching no standard size
/// within tolerance produce a [`PaperSize::Custom`].
pub fn resolve(width_px: u32, height_px: u32, dpi: u32) -> PaperSize {
    let dpi = dpi.max(1) as f64;
    let width_mm = width_px as f64 / dpi * MM_PER_INCH;
    let height_mm = height_px as f64 / dpi * MM_PER_INCH;
    resolve_mm(width_mm, height_mm)
}

/// Infer a paper size from physical dimensions in millimetres.
///
/// The nearest standard size wins by Chebyshev distance (larger of the
/// per-axis deviations); candidates beyond [`SIZE_TOLERANCE_MM`] on either
/// axis are rejected.
pub fn resolve_mm(width_mm: f64, height_mm: f64) -> PaperSize {
    let mut best: Option<(PaperSize, f64)> = None;
    for &(size, w, h) in STANDARD_SIZES {
        let dw = (width_mm - w).abs();
        let dh = (height_mm - h).abs();
        if dw > SIZE_TOLERANCE_MM || dh > SIZE_TOLERANCE_MM {
            continue;
        }
        let distance = dw.max(dh);
        // Strict < keeps the earlier (more common) entry on a tie.
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((size, distance));
        }
    }
    match best {
        Some((size, _)) => size,
        None => PaperSize::Custom {
            width_mm: width_mm.round().max(1.0) as u32,
            height_mm: height_mm.round().max(1.0) as u32,
        },
    }
}
