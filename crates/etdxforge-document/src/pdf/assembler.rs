// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembly — compose page images into a PDF using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use etdxforge_core::{ConvertError, Page, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

/// Compose pages into a PDF, one page image per PDF page, full bleed.
///
/// Pages must already be in final order; each page's paper size and DPI
/// determine its physical page dimensions and image placement. A page with
/// zero-area image dimensions aborts assembly.
#[instrument(skip(pages), fields(pages = pages.len()))]
pub fn assemble(pages: &[Page], title: &str) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new(title);
    let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(pages.len());

    for page in pages {
        if !page.has_area() {
            return Err(ConvertError::Assembly(format!(
                "page {} has zero-area image ({}x{})",
                page.index,
                page.width(),
                page.height()
            )));
        }

        let (w_mm, h_mm) = page.paper.dimensions_mm();
        let page_w = Mm(w_mm as f32);
        let page_h = Mm(h_mm as f32);

        let rgb = page.image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: page.width() as usize,
            height: page.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = doc.add_image(&raw);

        // Native image size in points at the page DPI, then scale so the
        // image covers the page edge to edge.
        let dpi = page.dpi.max(1) as f32;
        let img_w_pt = page.width() as f32 / dpi * 72.0;
        let img_h_pt = page.height() as f32 / dpi * 72.0;
        let scale_x = page_w.into_pt().0 / img_w_pt;
        let scale_y = page_h.into_pt().0 / img_h_pt;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                dpi: Some(dpi),
                rotate: None,
            },
        }];

        debug!(
            index = page.index,
            paper = ?page.paper,
            scale_x,
            scale_y,
            "page placed"
        );
        pdf_pages.push(PdfPage::new(page_w, page_h, ops));
    }

    doc.with_pages(pdf_pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    info!(pages = pages.len(), bytes = output.len(), "PDF assembled");
    Ok(output)
}
