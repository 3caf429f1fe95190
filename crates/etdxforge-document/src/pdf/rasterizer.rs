// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterization via pdfium.
//
// pdfium wraps a C++ library with thread-local state, so all rendering for
// one document happens sequentially on the calling thread; parallelism in
// the pipeline applies to the per-page work that follows rasterization.

use std::path::Path;

use etdxforge_core::{ConvertError, PageError, PaperSize, Result};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::paper;

/// One rasterized PDF page with its inferred paper size.
#[derive(Debug)]
pub struct RasterizedPage {
    pub index: usize,
    pub image: DynamicImage,
    pub paper: PaperSize,
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Render every page of `pdf_path` at `dpi`.
///
/// Failure to open the document is fatal; failure to render one page fills
/// that page's slot with a [`PageError`] so siblings still render.
#[instrument]
pub fn rasterize(
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<std::result::Result<RasterizedPage, PageError>>> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::Pdf(format!("failed to open {}: {e:?}", pdf_path.display())))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!(total, dpi, "PDF loaded for rasterization");

    let dpi = dpi.max(1);
    let mut results = Vec::with_capacity(total);
    for index in 0..total {
        match render_page(&pages, index, dpi) {
            Ok(page) => results.push(Ok(page)),
            Err(reason) => {
                warn!(index, %reason, "page failed to rasterize");
                results.push(Err(PageError::new(index, ConvertError::Pdf(reason))));
            }
        }
    }
    Ok(results)
}

fn render_page(
    pages: &PdfPages<'_>,
    index: usize,
    dpi: u32,
) -> std::result::Result<RasterizedPage, String> {
    let page = pages
        .get(index as u16)
        .map_err(|e| format!("page lookup failed: {e:?}"))?;

    let width_pt = page.width().value;
    let height_pt = page.height().value;
    let target_w = (width_pt * dpi as f32 / 72.0).round() as i32;
    let target_h = (height_pt * dpi as f32 / 72.0).round() as i32;

    let render_config = PdfRenderConfig::new()
        .set_target_width(target_w.max(1))
        .set_maximum_height(target_h.max(1));

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("render failed: {e:?}"))?;
    let image = bitmap.as_image();

    let paper = paper::resolve_mm(
        paper::points_to_mm(width_pt as f64),
        paper::points_to_mm(height_pt as f64),
    );
    debug!(
        index,
        width = image.width(),
        height = image.height(),
        ?paper,
        "page rasterized"
    );

    Ok(RasterizedPage {
        index,
        image,
        paper,
        width_pt,
        height_pt,
    })
}
