// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types shared across the conversion pipeline.

use thiserror::Error;

/// Fatal conversion errors that abort a whole run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The archive as a whole is unusable (not a ZIP, missing or
    /// unparsable manifests, inconsistent page list).
    #[error("invalid ETDX archive: {0}")]
    ArchiveFormat(String),

    /// A single page failed and the run is not best-effort.
    #[error("page {index} is corrupt: {reason}")]
    PageCorrupt { index: usize, reason: String },

    /// PDF assembly failed.
    #[error("PDF assembly failed: {0}")]
    Assembly(String),

    /// The source PDF could not be opened or rasterized.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Image decoding or encoding failed outside a per-page context.
    #[error("image error: {0}")]
    Image(String),

    /// The run was cancelled before completion.
    #[error("conversion cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// A failure scoped to one page of a best-effort run.
#[derive(Debug)]
pub struct PageError {
    pub index: usize,
    pub error: ConvertError,
}

impl PageError {
    pub fn new(index: usize, error: ConvertError) -> Self {
        Self { index, error }
    }

    /// Re-wrap as a fatal error carrying the page index.
    pub fn into_fatal(self) -> ConvertError {
        match self.error {
            e @ ConvertError::Cancelled => e,
            ConvertError::PageCorrupt { index, reason } => {
                ConvertError::PageCorrupt { index, reason }
            }
            other => ConvertError::PageCorrupt {
                index: self.index,
                reason: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}: {}", self.index, self.error)
    }
}

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
