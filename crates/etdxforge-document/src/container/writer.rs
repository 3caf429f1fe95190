// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ETDX archive writer.

use std::io::{Cursor, Write};
use std::path::Path;

use etdxforge_core::{ConversionConfig, ConvertError, Document, Page, PageImageFormat, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::manifest::{
    page_folder, MasterTemplate, PageManifest, ProjectManifest, PAGE_LIST_FILE, PROJECT_FILE,
    TEMPLATE_FILE,
};

/// Serialize a document into an ETDX archive at `archive_path`.
///
/// Page images are encoded per `config.image_format` and
/// `config.jpeg_quality`. The archive is written to a temporary file in the
/// destination directory and renamed into place, so a failed encode leaves
/// no partial archive.
#[instrument(skip(document, config), fields(pages = document.page_count()))]
pub fn encode(document: &Document, archive_path: &Path, config: &ConversionConfig) -> Result<()> {
    let parent = archive_path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(parent)?;

    write_archive(document, config, tmp.as_file())?;

    tmp.persist(archive_path).map_err(|e| e.error)?;
    debug!(path = %archive_path.display(), "ETDX archive written");
    Ok(())
}

fn write_archive(
    document: &Document,
    config: &ConversionConfig,
    file: &std::fs::File,
) -> Result<()> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let default_paper = document
        .pages()
        .first()
        .map(|p| p.paper)
        .unwrap_or(etdxforge_core::PaperSize::A4);

    let project = ProjectManifest::new(document.page_count());
    let template = MasterTemplate {
        dpi: config.dpi,
        default_paper_size: default_paper,
    };
    let page_list: Vec<String> = (1..=document.page_count()).map(page_folder).collect();

    write_json(&mut zip, PROJECT_FILE, &project, options)?;
    write_json(&mut zip, TEMPLATE_FILE, &template, options)?;
    write_json(&mut zip, PAGE_LIST_FILE, &page_list, options)?;

    for page in document.pages() {
        write_page(&mut zip, page, config, options)?;
    }

    zip.finish()
        .map_err(|e| ConvertError::ArchiveFormat(e.to_string()))?;
    Ok(())
}

fn write_json<W, T>(
    zip: &mut ZipWriter<W>,
    name: &str,
    value: &T,
    options: SimpleFileOptions,
) -> Result<()>
where
    W: Write + std::io::Seek,
    T: serde::Serialize,
{
    zip.start_file(name, options)
        .map_err(|e| ConvertError::ArchiveFormat(e.to_string()))?;
    let bytes = serde_json::to_vec_pretty(value)?;
    zip.write_all(&bytes)?;
    Ok(())
}

// Pages are (re)encoded per the run config, not per whatever format the
// page was decoded from.
fn write_page<W>(
    zip: &mut ZipWriter<W>,
    page: &Page,
    config: &ConversionConfig,
    options: SimpleFileOptions,
) -> Result<()>
where
    W: Write + std::io::Seek,
{
    let folder = page_folder(page.index + 1);
    let manifest = PageManifest {
        index: page.index,
        width: page.width(),
        height: page.height(),
        paper_size: page.paper,
        dpi: page.dpi,
        format: config.image_format,
        jpeg_quality: match config.image_format {
            PageImageFormat::Jpeg => Some(config.jpeg_quality),
            PageImageFormat::Png => None,
        },
    };
    write_json(zip, &format!("{folder}/{folder}.json"), &manifest, options)?;

    let image_name = format!("{folder}/{folder}.{}", config.image_format.extension());
    zip.start_file(image_name.as_str(), options)
        .map_err(|e| ConvertError::ArchiveFormat(e.to_string()))?;
    let bytes = encode_image(page, config.image_format, config.jpeg_quality)?;
    zip.write_all(&bytes)?;
    Ok(())
}

fn encode_image(page: &Page, format: PageImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        PageImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            encoder
                .encode_image(&page.image.to_rgb8())
                .map_err(|e| ConvertError::Image(e.to_string()))?;
        }
        PageImageFormat::Png => {
            page.image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| ConvertError::Image(e.to_string()))?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use etdxforge_core::PaperSize;
    use image::DynamicImage;
    use std::io::Read;

    fn sample_document(pages: usize) -> Document {
        let mut doc = Document::new();
        for _ in 0..pages {
            doc.push(
                DynamicImage::new_rgb8(8, 8),
                PaperSize::A4,
                300,
                PageImageFormat::Png,
                90,
            );
        }
        doc
    }

    fn png_config() -> ConversionConfig {
        ConversionConfig {
            image_format: PageImageFormat::Png,
            ..ConversionConfig::default()
        }
    }

    #[test]
    fn encode_writes_all_expected_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.etdx");
        encode(&sample_document(2), &path, &png_config()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        for expected in [
            "project.json",
            "master_template.json",
            "page_list.json",
            "page_1/page_1.json",
            "page_1/page_1.png",
            "page_2/page_2.json",
            "page_2/page_2.png",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn page_list_matches_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.etdx");
        encode(&sample_document(3), &path, &png_config()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut raw = String::new();
        zip.by_name("page_list.json")
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        let list: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(list, vec!["page_1", "page_2", "page_3"]);
    }

    #[test]
    fn failed_encode_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.etdx");
        // Parent does not exist, so the temp file cannot be created.
        let result = encode(&sample_document(1), &path, &png_config());
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn config_format_overrides_page_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.etdx");
        // Pages carry PNG metadata, but the run config asks for JPEG.
        let config = ConversionConfig {
            image_format: PageImageFormat::Jpeg,
            jpeg_quality: 80,
            ..ConversionConfig::default()
        };
        encode(&sample_document(1), &path, &config).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"page_1/page_1.jpg".to_string()));
        assert!(!names.contains(&"page_1/page_1.png".to_string()));

        let mut raw = String::new();
        zip.by_name("page_1/page_1.json")
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        let manifest: PageManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(manifest.format, PageImageFormat::Jpeg);
        assert_eq!(manifest.jpeg_quality, Some(80));
    }

    #[test]
    fn empty_document_still_produces_valid_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.etdx");
        encode(&Document::new(), &path, &ConversionConfig::default()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut raw = String::new();
        zip.by_name("project.json")
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        let project: ProjectManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(project.page_count, 0);
    }
}
