// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration and execution-environment capabilities.

use serde::{Deserialize, Serialize};

use crate::types::{DevicePreference, PageImageFormat, ScaleFactor};

/// Options governing a single conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Rasterization and inference DPI.
    pub dpi: u32,
    /// Encoding for page images written into ETDX archives.
    pub image_format: PageImageFormat,
    /// JPEG quality (1-100) when `image_format` is JPEG.
    pub jpeg_quality: u8,
    /// Whether to run super-resolution during ETDX to PDF conversion.
    pub upscale: bool,
    /// Super-resolution scale factor.
    pub scale_factor: ScaleFactor,
    /// Inference device selection.
    pub device: DevicePreference,
    /// Allow per-page parallelism when the environment supports it.
    pub parallel: bool,
    /// Continue past corrupt pages instead of failing the whole run.
    pub best_effort: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            image_format: PageImageFormat::Jpeg,
            jpeg_quality: 90,
            upscale: true,
            scale_factor: ScaleFactor::X4,
            device: DevicePreference::Auto,
            parallel: true,
            best_effort: false,
        }
    }
}

/// Capabilities of the process hosting a conversion run.
///
/// Packaged builds that cannot spawn worker threads safely set
/// `parallelism_supported` to false; the pipeline then runs pages
/// sequentially regardless of [`ConversionConfig::parallel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub parallelism_supported: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            parallelism_supported: true,
        }
    }
}

impl ExecutionContext {
    /// Whether a run with this config may use worker threads.
    pub fn allows_parallelism(&self, config: &ConversionConfig) -> bool {
        self.parallelism_supported && config.parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConversionConfig::default();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.upscale);
        assert!(config.parallel);
        assert!(!config.best_effort);
        assert_eq!(config.scale_factor, ScaleFactor::X4);
        assert_eq!(config.device, DevicePreference::Auto);
    }

    #[test]
    fn restricted_context_overrides_config() {
        let config = ConversionConfig::default();
        let ctx = ExecutionContext {
            parallelism_supported: false,
        };
        assert!(!ctx.allows_parallelism(&config));
        assert!(ExecutionContext::default().allows_parallelism(&config));
    }
}
