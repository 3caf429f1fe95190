// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The two conversion entry points: PDF -> ETDX and ETDX -> PDF.

use std::io::Write;
use std::path::Path;

use etdxforge_core::{
    ConversionConfig, ConvertError, Document, Page, PageError, Result, ScaleFactor,
};
use etdxforge_document::container::{reader, writer};
use etdxforge_document::pdf::{assembler, rasterizer};
use etdxforge_upscale::{UpscaleEngine, UpscalePath};
use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::context::RunContext;
use crate::executor;

/// Outcome summary returned alongside success, and the partial-success
/// manifest in best-effort mode.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Pages the source document contained.
    pub total_pages: usize,
    /// Pages present in the written output.
    pub succeeded_pages: usize,
    /// Per-page failures (empty unless best-effort mode let the run finish
    /// past them).
    pub failed_pages: Vec<PageError>,
    /// Pages upscaled by a model.
    pub model_upscaled_pages: usize,
    /// Pages upscaled by the resampling fallback.
    pub resampled_pages: usize,
}

/// One page after per-page processing.
struct ProcessedPage {
    page: Page,
    upscale_path: Option<UpscalePath>,
}

/// Convert a PDF into an ETDX archive.
#[instrument(skip(config, ctx))]
pub fn pdf_to_etdx(
    pdf_path: &Path,
    output_path: &Path,
    config: &ConversionConfig,
    ctx: &RunContext,
) -> Result<ConversionReport> {
    let rasterized = rasterizer::rasterize(pdf_path, config.dpi)?;
    let total_pages = rasterized.len();

    let mut failed: Vec<PageError> = Vec::new();
    let mut inputs: Vec<(usize, rasterizer::RasterizedPage)> = Vec::new();
    for slot in rasterized {
        match slot {
            Ok(page) => inputs.push((page.index, page)),
            Err(err) => failed.push(err),
        }
    }

    let engine = UpscaleEngine::new(ctx.cache().clone(), ctx.probe().clone());
    let parallel = ctx.execution().allows_parallelism(config);
    let cancel = ctx.cancel_flag();

    let results = executor::run_pages(inputs, parallel, &cancel, |index, raster| {
        let (image, upscale_path) = maybe_upscale(&engine, raster.image, config);
        let dpi = effective_dpi_for(config.dpi, config.scale_factor, upscale_path);
        Ok(ProcessedPage {
            page: Page {
                index,
                image,
                paper: raster.paper,
                dpi,
                format: config.image_format,
                jpeg_quality: config.jpeg_quality,
            },
            upscale_path,
        })
    });

    let (pages, mut report) = collect_pages(results, &mut failed);
    report.total_pages = total_pages;

    enforce_policy(&mut report, failed, config)?;

    let document = Document::from_pages(pages);
    report.succeeded_pages = document.page_count();
    writer::encode(&document, output_path, config)?;

    info!(
        total = report.total_pages,
        ok = report.succeeded_pages,
        failed = report.failed_pages.len(),
        "PDF converted to ETDX"
    );
    Ok(report)
}

/// Convert an ETDX archive into a PDF.
#[instrument(skip(config, ctx))]
pub fn etdx_to_pdf(
    etdx_path: &Path,
    output_path: &Path,
    config: &ConversionConfig,
    ctx: &RunContext,
) -> Result<ConversionReport> {
    let decoded = reader::decode(etdx_path)?;
    let total_pages = decoded.pages.len();

    let mut failed: Vec<PageError> = Vec::new();
    let mut inputs: Vec<(usize, Page)> = Vec::new();
    for slot in decoded.pages {
        match slot {
            Ok(page) => inputs.push((page.index, page)),
            Err(err) => failed.push(err),
        }
    }

    let engine = UpscaleEngine::new(ctx.cache().clone(), ctx.probe().clone());
    let parallel = ctx.execution().allows_parallelism(config);
    let cancel = ctx.cancel_flag();

    let results = executor::run_pages(inputs, parallel, &cancel, |_, mut page| {
        let (image, upscale_path) = maybe_upscale(&engine, page.image, config);
        page.image = image;
        page.dpi = effective_dpi_for(page.dpi, config.scale_factor, upscale_path);
        Ok(ProcessedPage { page, upscale_path })
    });

    let (pages, mut report) = collect_pages(results, &mut failed);
    report.total_pages = total_pages;

    enforce_policy(&mut report, failed, config)?;

    let document = Document::from_pages(pages);
    report.succeeded_pages = document.page_count();

    let title = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "etdxforge".to_string());
    let bytes = assembler::assemble(document.pages(), &title)?;
    write_atomically(output_path, &bytes)?;

    info!(
        total = report.total_pages,
        ok = report.succeeded_pages,
        failed = report.failed_pages.len(),
        bytes = bytes.len(),
        "ETDX converted to PDF"
    );
    Ok(report)
}

// -- Shared helpers -----------------------------------------------------------

fn maybe_upscale(
    engine: &UpscaleEngine,
    image: DynamicImage,
    config: &ConversionConfig,
) -> (DynamicImage, Option<UpscalePath>) {
    if !config.upscale {
        return (image, None);
    }
    let result = engine.upscale(&image, config.scale_factor, &config.device);
    (result.image, Some(result.path))
}

/// Upscaling multiplies pixel dimensions at unchanged physical size, so the
/// recorded DPI scales with it. Both strategies apply the configured factor.
fn effective_dpi_for(dpi: u32, factor: ScaleFactor, upscale_path: Option<UpscalePath>) -> u32 {
    if upscale_path.is_some() {
        dpi * factor.multiplier()
    } else {
        dpi
    }
}

fn collect_pages(
    results: Vec<std::result::Result<ProcessedPage, PageError>>,
    failed: &mut Vec<PageError>,
) -> (Vec<Page>, ConversionReport) {
    let mut report = ConversionReport::default();
    let mut pages = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(processed) => {
                match processed.upscale_path {
                    Some(UpscalePath::Model { .. }) => report.model_upscaled_pages += 1,
                    Some(UpscalePath::Resample) => report.resampled_pages += 1,
                    None => {}
                }
                pages.push(processed.page);
            }
            Err(err) => failed.push(err),
        }
    }
    (pages, report)
}

/// Apply the best-effort policy: without it the first page failure is
/// fatal; with it, failures ride along in the report. Cancellation is
/// always fatal.
fn enforce_policy(
    report: &mut ConversionReport,
    mut failed: Vec<PageError>,
    config: &ConversionConfig,
) -> Result<()> {
    failed.sort_by_key(|e| e.index);
    if failed
        .iter()
        .any(|e| matches!(e.error, ConvertError::Cancelled))
    {
        return Err(ConvertError::Cancelled);
    }
    if !config.best_effort {
        if let Some(first) = failed.into_iter().next() {
            return Err(first.into_fatal());
        }
    } else {
        for err in &failed {
            warn!(index = err.index, error = %err.error, "page skipped");
        }
        report.failed_pages = failed;
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
