// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Real-ESRGAN model identification and on-disk location.

use std::path::{Path, PathBuf};

use etdxforge_core::ScaleFactor;

/// The super-resolution models this crate knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleModel {
    RealEsrganX2,
    RealEsrganX4,
}

impl ScaleModel {
    pub fn for_factor(factor: ScaleFactor) -> Self {
        match factor {
            ScaleFactor::X2 => Self::RealEsrganX2,
            ScaleFactor::X4 => Self::RealEsrganX4,
        }
    }

    /// ONNX file name inside the model directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::RealEsrganX2 => "RealESRGAN_x2.onnx",
            Self::RealEsrganX4 => "RealESRGAN_x4.onnx",
        }
    }

    /// Linear scale the model applies to each side.
    pub fn scale(&self) -> u32 {
        match self {
            Self::RealEsrganX2 => 2,
            Self::RealEsrganX4 => 4,
        }
    }
}

/// Resolves model files on disk.
#[derive(Debug, Clone)]
pub struct ModelLocator {
    dir: PathBuf,
}

impl ModelLocator {
    /// Models under `$XDG_CACHE_HOME/etdxforge/models` (falling back to
    /// `~/.cache`).
    pub fn system_default() -> Self {
        let base = std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            dir: base.join("etdxforge").join("models"),
        }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, model: ScaleModel) -> PathBuf {
        self.dir.join(model.file_name())
    }

    /// Whether the model file exists and is non-empty.
    pub fn is_present(&self, model: ScaleModel) -> bool {
        self.path_for(model)
            .metadata()
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }
}
