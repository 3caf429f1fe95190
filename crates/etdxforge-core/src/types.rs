// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the etdxforge conversion engine.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Standard paper sizes recognised by the paper-size resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Pixel dimensions of a full page at the given DPI.
    pub fn dimensions_px(&self, dpi: u32) -> (u32, u32) {
        let (w_mm, h_mm) = self.dimensions_mm();
        let to_px = |mm: u32| (mm as f64 / 25.4 * dpi as f64).round() as u32;
        (to_px(w_mm), to_px(h_mm))
    }
}

/// Encoding used for a page's raster image inside the ETDX archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageImageFormat {
    Jpeg,
    Png,
}

impl PageImageFormat {
    /// File extension used for page images in the archive.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Supported super-resolution scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleFactor {
    X2,
    X4,
}

impl ScaleFactor {
    /// The linear pixel multiplier of this factor.
    pub fn multiplier(&self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

/// A compute target for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    /// NVIDIA GPU via the CUDA execution provider.
    Cuda { ordinal: u32 },
    /// Windows GPU via the DirectML execution provider.
    DirectMl { ordinal: u32 },
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda { ordinal } => write!(f, "cuda:{ordinal}"),
            Self::DirectMl { ordinal } => write!(f, "dml:{ordinal}"),
        }
    }
}

/// How the caller wants the inference device chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    /// Probe available devices and pick the best one.
    Auto,
    /// Use exactly this device, no probing.
    Explicit(Device),
}

/// One document page: metadata plus exactly one raster image.
///
/// `index` is 0-based and matches the page's position in the final PDF; the
/// archive folder numbering (`page_1`, `page_2`, …) is `index + 1`.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub image: DynamicImage,
    pub paper: PaperSize,
    pub dpi: u32,
    pub format: PageImageFormat,
    pub jpeg_quality: u8,
}

impl Page {
    /// Pixel width of the page image.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Pixel height of the page image.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the page image has positive dimensions.
    pub fn has_area(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

/// An ordered page set, owned exclusively by the conversion call that built it.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Append a page, assigning it the next contiguous index.
    pub fn push(
        &mut self,
        image: DynamicImage,
        paper: PaperSize,
        dpi: u32,
        format: PageImageFormat,
        jpeg_quality: u8,
    ) {
        let index = self.pages.len();
        self.pages.push(Page {
            index,
            image,
            paper,
            dpi,
            format,
            jpeg_quality,
        });
    }

    /// Build a document from pages already carrying indices.
    ///
    /// Pages are re-sorted and re-indexed so that indices form a contiguous
    /// 0..N-1 sequence in the original relative order.
    pub fn from_pages(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.index);
        for (i, page) in pages.iter_mut().enumerate() {
            page.index = i;
        }
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_pixel_dimensions_at_300_dpi() {
        let (w, h) = PaperSize::A4.dimensions_px(300);
        assert_eq!((w, h), (2480, 3508));
    }

    #[test]
    fn custom_size_round_trips_dimensions() {
        let size = PaperSize::Custom {
            width_mm: 100,
            height_mm: 150,
        };
        assert_eq!(size.dimensions_mm(), (100, 150));
    }

    #[test]
    fn document_push_assigns_contiguous_indices() {
        let mut doc = Document::new();
        for _ in 0..3 {
            doc.push(
                DynamicImage::new_rgb8(4, 4),
                PaperSize::A4,
                300,
                PageImageFormat::Png,
                90,
            );
        }
        let indices: Vec<usize> = doc.pages().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn from_pages_reindexes_preserving_order() {
        let mk = |index| Page {
            index,
            image: DynamicImage::new_rgb8(2, 2),
            paper: PaperSize::A4,
            dpi: 300,
            format: PageImageFormat::Png,
            jpeg_quality: 90,
        };
        // Sparse indices, e.g. after a best-effort decode dropped page 1.
        let doc = Document::from_pages(vec![mk(2), mk(0)]);
        let indices: Vec<usize> = doc.pages().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda { ordinal: 0 }.to_string(), "cuda:0");
    }
}
