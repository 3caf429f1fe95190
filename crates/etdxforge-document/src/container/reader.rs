// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ETDX archive reader.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use etdxforge_core::{ConvertError, Page, PageError, PageImageFormat, Result};
use image::ImageFormat;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;

use super::manifest::{
    MasterTemplate, PageManifest, ProjectManifest, PAGE_LIST_FILE, PROJECT_FILE, TEMPLATE_FILE,
};

/// The result of decoding an archive: manifests plus one slot per listed
/// page, corrupt pages kept as errors so the caller can decide between
/// failing fast and best-effort continuation.
#[derive(Debug)]
pub struct DecodedArchive {
    pub project: ProjectManifest,
    pub template: MasterTemplate,
    pub pages: Vec<std::result::Result<Page, PageError>>,
}

impl DecodedArchive {
    /// Indices of pages that failed to decode.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter_map(|slot| slot.as_ref().err().map(|e| e.index))
            .collect()
    }
}

/// Deserialize an ETDX archive.
///
/// Top-level problems (not a ZIP, missing or unparsable manifests, page
/// list disagreeing with the folders present) are fatal. Per-page problems
/// are captured in the page's slot; the page index is the page's position
/// in `page_list.json`.
#[instrument]
pub fn decode(archive_path: &Path) -> Result<DecodedArchive> {
    let file = File::open(archive_path)?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| ConvertError::ArchiveFormat(e.to_string()))?;

    let project: ProjectManifest = read_manifest(&mut zip, PROJECT_FILE)?;
    let template: MasterTemplate = read_manifest(&mut zip, TEMPLATE_FILE)?;
    let page_list: Vec<String> = read_manifest(&mut zip, PAGE_LIST_FILE)?;

    let folders = page_folders_present(&zip);
    if folders.len() != page_list.len() {
        return Err(ConvertError::ArchiveFormat(format!(
            "page list names {} pages but archive contains {} page folders",
            page_list.len(),
            folders.len()
        )));
    }

    let mut pages = Vec::with_capacity(page_list.len());
    for (index, folder) in page_list.iter().enumerate() {
        match read_page(&mut zip, index, folder) {
            Ok(page) => pages.push(Ok(page)),
            Err(reason) => {
                warn!(index, folder = %folder, %reason, "page failed to decode");
                pages.push(Err(PageError::new(
                    index,
                    ConvertError::PageCorrupt { index, reason },
                )));
            }
        }
    }

    debug!(
        total = pages.len(),
        failed = pages.iter().filter(|p| p.is_err()).count(),
        "archive decoded"
    );
    Ok(DecodedArchive {
        project,
        template,
        pages,
    })
}

fn read_manifest<T: serde::de::DeserializeOwned>(
    zip: &mut ZipArchive<File>,
    name: &str,
) -> Result<T> {
    let mut raw = String::new();
    zip.by_name(name)
        .map_err(|_| ConvertError::ArchiveFormat(format!("missing {name}")))?
        .read_to_string(&mut raw)?;
    serde_json::from_str(&raw)
        .map_err(|e| ConvertError::ArchiveFormat(format!("unparsable {name}: {e}")))
}

/// Distinct top-level `page_*/` folders present in the archive.
fn page_folders_present(zip: &ZipArchive<File>) -> HashSet<String> {
    let mut folders = HashSet::new();
    for name in zip.file_names() {
        if let Some((folder, _)) = name.split_once('/') {
            if folder.starts_with("page_") {
                folders.insert(folder.to_string());
            }
        }
    }
    folders
}

fn read_page(
    zip: &mut ZipArchive<File>,
    index: usize,
    folder: &str,
) -> std::result::Result<Page, String> {
    let manifest_name = format!("{folder}/{folder}.json");
    let mut raw = String::new();
    zip.by_name(&manifest_name)
        .map_err(|_| format!("missing manifest {manifest_name}"))?
        .read_to_string(&mut raw)
        .map_err(|e| format!("unreadable manifest {manifest_name}: {e}"))?;
    let manifest: PageManifest =
        serde_json::from_str(&raw).map_err(|e| format!("invalid manifest {manifest_name}: {e}"))?;

    let image_name = format!("{folder}/{folder}.{}", manifest.format.extension());
    let mut bytes = Vec::new();
    zip.by_name(&image_name)
        .map_err(|_| format!("missing image {image_name}"))?
        .read_to_end(&mut bytes)
        .map_err(|e| format!("unreadable image {image_name}: {e}"))?;

    let actual = image::guess_format(&bytes)
        .map_err(|e| format!("unrecognized image data in {image_name}: {e}"))?;
    let declared = match manifest.format {
        PageImageFormat::Jpeg => ImageFormat::Jpeg,
        PageImageFormat::Png => ImageFormat::Png,
    };
    if actual != declared {
        return Err(format!(
            "image {image_name} declared as {declared:?} but encoded as {actual:?}"
        ));
    }

    let image = image::load_from_memory_with_format(&bytes, actual)
        .map_err(|e| format!("undecodable image {image_name}: {e}"))?;
    if image.width() != manifest.width || image.height() != manifest.height {
        return Err(format!(
            "image {image_name} is {}x{} but manifest declares {}x{}",
            image.width(),
            image.height(),
            manifest.width,
            manifest.height
        ));
    }

    Ok(Page {
        index,
        image,
        paper: manifest.paper_size,
        dpi: manifest.dpi,
        format: manifest.format,
        jpeg_quality: manifest.jpeg_quality.unwrap_or(90),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::writer::encode;
    use etdxforge_core::{ConversionConfig, Document, PaperSize};
    use image::DynamicImage;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn patterned(w: u32, h: u32, seed: u8) -> DynamicImage {
        let mut img = image::RgbImage::new(w, h);
        for (x, y, px) in img.enumerate_pixels_mut() {
            px.0 = [
                seed.wrapping_add(x as u8),
                seed.wrapping_mul(3).wrapping_add(y as u8),
                seed ^ (x + y) as u8,
            ];
        }
        DynamicImage::ImageRgb8(img)
    }

    fn sample_archive(dir: &Path, pages: usize) -> std::path::PathBuf {
        let mut doc = Document::new();
        for i in 0..pages {
            doc.push(
                patterned(8 + i as u32, 8, i as u8),
                PaperSize::A4,
                300,
                PageImageFormat::Png,
                90,
            );
        }
        let path = dir.join("sample.etdx");
        let config = ConversionConfig {
            image_format: PageImageFormat::Png,
            ..ConversionConfig::default()
        };
        encode(&doc, &path, &config).unwrap();
        path
    }

    /// Rewrite an archive, replacing the body of one entry.
    fn rewrite_with(src: &Path, dst: &Path, target: &str, replacement: &[u8]) {
        let mut zip = ZipArchive::new(File::open(src).unwrap()).unwrap();
        let out = File::create(dst).unwrap();
        let mut writer = ZipWriter::new(out);
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        for name in names {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            if name == target {
                writer.write_all(replacement).unwrap();
            } else {
                let mut bytes = Vec::new();
                zip.by_name(&name).unwrap().read_to_end(&mut bytes).unwrap();
                writer.write_all(&bytes).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn round_trip_preserves_order_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path(), 3);
        let decoded = decode(&path).unwrap();
        assert_eq!(decoded.project.page_count, 3);
        assert_eq!(decoded.pages.len(), 3);
        for (i, slot) in decoded.pages.iter().enumerate() {
            let page = slot.as_ref().unwrap();
            assert_eq!(page.index, i);
            assert_eq!(page.paper, PaperSize::A4);
            assert_eq!(page.width(), 8 + i as u32);
            // PNG is lossless, so pixel data survives the round trip exactly.
            assert_eq!(
                page.image.to_rgb8().into_raw(),
                patterned(8 + i as u32, 8, i as u8).to_rgb8().into_raw()
            );
        }
    }

    #[test]
    fn jpeg_round_trip_error_is_bounded_at_fixed_quality() {
        let dir = tempfile::tempdir().unwrap();
        // A smooth gradient so the error budget reflects quantisation, not
        // edge ringing.
        let mut img = image::RgbImage::new(32, 32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            px.0 = [(x * 7) as u8, (y * 7) as u8, 128];
        }
        let original = img.clone();
        let mut doc = Document::new();
        doc.push(
            DynamicImage::ImageRgb8(img),
            PaperSize::A4,
            300,
            PageImageFormat::Jpeg,
            90,
        );
        let config = ConversionConfig {
            image_format: PageImageFormat::Jpeg,
            jpeg_quality: 90,
            ..ConversionConfig::default()
        };
        let path = dir.path().join("lossy.etdx");
        encode(&doc, &path, &config).unwrap();

        let decoded = decode(&path).unwrap();
        let page = decoded.pages[0].as_ref().unwrap();
        assert_eq!(page.format, PageImageFormat::Jpeg);
        assert_eq!(page.jpeg_quality, 90);
        let restored = page.image.to_rgb8();
        assert_eq!(restored.dimensions(), original.dimensions());
        let max_diff = original
            .as_raw()
            .iter()
            .zip(restored.as_raw())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap();
        assert!(max_diff <= 20, "per-channel error {max_diff} exceeds bound");
    }

    #[test]
    fn not_a_zip_is_archive_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.etdx");
        std::fs::write(&path, b"not a zip at all").unwrap();
        assert!(matches!(
            decode(&path),
            Err(ConvertError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn truncated_page_manifest_is_page_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let src = sample_archive(dir.path(), 3);
        let dst = dir.path().join("truncated.etdx");
        rewrite_with(&src, &dst, "page_2/page_2.json", b"{\"index\": 1, \"wid");

        let decoded = decode(&dst).unwrap();
        assert!(decoded.pages[0].is_ok());
        assert!(decoded.pages[2].is_ok());
        let err = decoded.pages[1].as_ref().unwrap_err();
        assert_eq!(err.index, 1);
        assert!(matches!(
            err.error,
            ConvertError::PageCorrupt { index: 1, .. }
        ));
    }

    #[test]
    fn format_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let src = sample_archive(dir.path(), 1);
        let dst = dir.path().join("mismatch.etdx");
        // JPEG data behind a .png name.
        let mut jpeg = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 80);
        encoder
            .encode_image(&DynamicImage::new_rgb8(8, 8).to_rgb8())
            .unwrap();
        rewrite_with(&src, &dst, "page_1/page_1.png", &jpeg);

        let decoded = decode(&dst).unwrap();
        assert_eq!(decoded.failed_indices(), vec![0]);
    }

    #[test]
    fn page_list_folder_disagreement_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = sample_archive(dir.path(), 2);
        let dst = dir.path().join("short_list.etdx");
        rewrite_with(&src, &dst, "page_list.json", b"[\"page_1\"]");
        assert!(matches!(
            decode(&dst),
            Err(ConvertError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn dimension_disagreement_is_page_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let src = sample_archive(dir.path(), 1);
        let dst = dir.path().join("dims.etdx");
        let manifest = r#"{"index":0,"width":999,"height":8,"paperSize":"A4","dpi":300,"format":"png"}"#;
        rewrite_with(&src, &dst, "page_1/page_1.json", manifest.as_bytes());
        let decoded = decode(&dst).unwrap();
        assert_eq!(decoded.failed_indices(), vec![0]);
    }
}
