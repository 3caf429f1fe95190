// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON manifest schemas for the ETDX container.

use chrono::{DateTime, Utc};
use etdxforge_core::{PageImageFormat, PaperSize};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current ETDX format version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Value written into `project.json`'s `createdWith` field.
pub const CREATED_WITH: &str = concat!("etdxforge/", env!("CARGO_PKG_VERSION"));

pub const PROJECT_FILE: &str = "project.json";
pub const TEMPLATE_FILE: &str = "master_template.json";
pub const PAGE_LIST_FILE: &str = "page_list.json";

/// Archive folder name for page number `n` (1-based).
pub fn page_folder(n: usize) -> String {
    format!("page_{n}")
}

/// Top-level `project.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    pub format_version: u32,
    pub created_with: String,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub page_count: usize,
}

impl ProjectManifest {
    pub fn new(page_count: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_with: CREATED_WITH.to_string(),
            project_id: Uuid::new_v4(),
            created_at: Utc::now(),
            page_count,
        }
    }
}

/// Shared per-document settings, `master_template.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterTemplate {
    pub dpi: u32,
    pub default_paper_size: PaperSize,
}

/// Per-page metadata, `page_<n>/page_<n>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageManifest {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub paper_size: PaperSize,
    pub dpi: u32,
    pub format: PageImageFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,
}
