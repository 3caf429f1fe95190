// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The upscale engine: ordered strategies ending in the resampling fallback.

use std::sync::Arc;

use etdxforge_core::{Device, DevicePreference, ScaleFactor};
use image::DynamicImage;
use tracing::{debug, instrument, warn};

use crate::cache::ModelCache;
use crate::device::{select_device, DeviceProbe};
use crate::model::ScaleModel;
use crate::resample;

/// Images smaller than this on either side skip model inference; the
/// Real-ESRGAN architecture degrades badly on tiny inputs.
const MIN_MODEL_INPUT_PX: u32 = 32;

/// How an upscaled image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscalePath {
    Model { model: ScaleModel, device: Device },
    Resample,
}

/// One failed strategy, kept for observability.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub device: Device,
    pub error: String,
}

/// Result of an upscale request. Always carries an image.
#[derive(Debug)]
pub struct Upscaled {
    pub image: DynamicImage,
    pub path: UpscalePath,
    pub attempts: Vec<Attempt>,
}

/// Runs the model-then-fallback strategy chain.
///
/// The engine never fails outward: device and model problems are absorbed
/// into the deterministic Lanczos fallback and reported as log events.
pub struct UpscaleEngine {
    cache: Arc<ModelCache>,
    probe: Arc<dyn DeviceProbe>,
}

impl UpscaleEngine {
    pub fn new(cache: Arc<ModelCache>, probe: Arc<dyn DeviceProbe>) -> Self {
        Self { cache, probe }
    }

    /// Upscale one image by `factor`.
    ///
    /// Strategy order: the selected device, then the CPU if the selection
    /// was an accelerator, then classical resampling. Inference output is
    /// trusted only if its dimensions are exactly `factor` times the input.
    #[instrument(skip_all, fields(w = image.width(), h = image.height(), factor = factor.multiplier()))]
    pub fn upscale(
        &self,
        image: &DynamicImage,
        factor: ScaleFactor,
        preference: &DevicePreference,
    ) -> Upscaled {
        let mut attempts = Vec::new();

        if image.width() < MIN_MODEL_INPUT_PX || image.height() < MIN_MODEL_INPUT_PX {
            debug!("image below model input minimum, resampling");
            return Upscaled {
                image: resample::resize(image, factor),
                path: UpscalePath::Resample,
                attempts,
            };
        }

        let model = ScaleModel::for_factor(factor);
        // An explicit device skips probing entirely; if it cannot load the
        // model, the CPU retry and resample fallback below take over.
        let primary = match preference {
            DevicePreference::Explicit(device) => *device,
            DevicePreference::Auto => select_device(preference, &self.probe.available_devices()),
        };
        let mut plan = vec![primary];
        if primary != Device::Cpu {
            plan.push(Device::Cpu);
        }

        for device in plan {
            match self.try_device(model, device, image, factor) {
                Ok(upscaled) => {
                    debug!(%device, "model path succeeded");
                    return Upscaled {
                        image: upscaled,
                        path: UpscalePath::Model { model, device },
                        attempts,
                    };
                }
                Err(error) => {
                    attempts.push(Attempt { device, error });
                }
            }
        }

        warn!(
            attempts = attempts.len(),
            "all model strategies failed, resampling"
        );
        Upscaled {
            image: resample::resize(image, factor),
            path: UpscalePath::Resample,
            attempts,
        }
    }

    fn try_device(
        &self,
        model: ScaleModel,
        device: Device,
        image: &DynamicImage,
        factor: ScaleFactor,
    ) -> Result<DynamicImage, String> {
        let loaded = self
            .cache
            .acquire(model, device)
            .map_err(|e| e.to_string())?;
        match loaded.run(image) {
            Ok(out) => {
                let m = factor.multiplier();
                if out.width() != image.width() * m || out.height() != image.height() * m {
                    // Wrong geometry means the model file is not the one we
                    // expect; evict so it is not reused.
                    self.cache.evict(model, device);
                    return Err(format!(
                        "model produced {}x{}, expected {}x{}",
                        out.width(),
                        out.height(),
                        image.width() * m,
                        image.height() * m
                    ));
                }
                Ok(out)
            }
            Err(err) => {
                // Inference failure may leave the session wedged; evict to
                // release its memory.
                self.cache.evict(model, device);
                Err(err.to_string())
            }
        }
    }
}
