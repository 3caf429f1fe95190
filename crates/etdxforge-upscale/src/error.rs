// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Internal errors for the upscale fallback chain. These never cross the
// crate's public API: the engine logs them and degrades to resampling.

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum UpscaleError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}
