// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Etdxforge — super-resolution upscaling.
//
// The public surface never fails: every upscale request produces an image,
// either from a Real-ESRGAN model on the best available device or from the
// deterministic Lanczos fallback. Device and model problems are logged and
// absorbed, not propagated.

pub mod cache;
pub mod device;
pub mod engine;
pub mod model;
pub mod resample;

mod error;

pub use cache::ModelCache;
pub use device::{select_device, DeviceProbe, FixedProbe, SystemProbe};
pub use engine::{Attempt, UpscaleEngine, UpscalePath, Upscaled};
pub use model::{ModelLocator, ScaleModel};

pub(crate) use error::UpscaleError;
