// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Model cache keyed by (model, device).
//
// The cache is owned by the run context and torn down explicitly via
// `clear()`. A device that fails to load a model is disabled for the rest
// of the run so later pages skip straight to the next strategy.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use etdxforge_core::Device;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::model::{ModelLocator, ScaleModel};
use crate::UpscaleError;

/// A model committed to an inference session on one device.
pub struct LoadedModel {
    model: ScaleModel,
    device: Device,
    #[cfg(feature = "ai")]
    session: Mutex<ort::session::Session>,
    #[cfg(feature = "ai")]
    input_name: String,
    #[cfg(feature = "ai")]
    output_name: String,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    pub fn model(&self) -> ScaleModel {
        self.model
    }

    pub fn device(&self) -> Device {
        self.device
    }

    #[cfg(feature = "ai")]
    fn load(
        locator: &ModelLocator,
        model: ScaleModel,
        device: Device,
    ) -> Result<Self, UpscaleError> {
        use ort::session::Session;
        use tracing::info;

        let path = locator.path_for(model);
        if !locator.is_present(model) {
            return Err(UpscaleError::ModelLoad(format!(
                "model file missing or empty: {}",
                path.display()
            )));
        }

        let ep = execution_provider_for(device)?;
        let session = Session::builder()
            .and_then(|b| b.with_execution_providers([ep]))
            .and_then(|b| b.commit_from_file(&path))
            .map_err(|e| UpscaleError::ModelLoad(e.to_string()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| UpscaleError::ModelLoad("model declares no inputs".into()))?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| UpscaleError::ModelLoad("model declares no outputs".into()))?;

        info!(?model, %device, path = %path.display(), "model session committed");
        Ok(Self {
            model,
            device,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    #[cfg(not(feature = "ai"))]
    fn load(
        _locator: &ModelLocator,
        _model: ScaleModel,
        _device: Device,
    ) -> Result<Self, UpscaleError> {
        Err(UpscaleError::DeviceUnavailable(
            "built without ONNX Runtime support".into(),
        ))
    }

    /// Run one image through the model.
    ///
    /// `Session::run` takes the session mutably, so inference on one loaded
    /// model is serialized by its mutex; distinct (model, device) entries
    /// run concurrently.
    #[cfg(feature = "ai")]
    pub(crate) fn run(&self, image: &DynamicImage) -> Result<DynamicImage, UpscaleError> {
        use ort::value::Tensor;

        let rgb = image.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        // HWC u8 -> NCHW f32 in [0, 1].
        let mut data = vec![0.0f32; 3 * height * width];
        for (y, row) in rgb.rows().enumerate() {
            for (x, px) in row.enumerate() {
                for c in 0..3 {
                    data[c * height * width + y * width + x] = px.0[c] as f32 / 255.0;
                }
            }
        }
        let tensor = Tensor::from_array(([1usize, 3, height, width], data))
            .map_err(|e| UpscaleError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| UpscaleError::Inference("inference session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| UpscaleError::Inference(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| UpscaleError::Inference("model produced no output".into()))?;
        let (shape, values) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| UpscaleError::Inference(e.to_string()))?;
        if shape.len() != 4 {
            return Err(UpscaleError::Inference(format!(
                "unexpected output rank {}",
                shape.len()
            )));
        }
        let out_h = shape[2] as usize;
        let out_w = shape[3] as usize;

        let mut out = image::RgbImage::new(out_w as u32, out_h as u32);
        for (y, row) in out.rows_mut().enumerate() {
            for (x, px) in row.enumerate() {
                for c in 0..3 {
                    let v = values[c * out_h * out_w + y * out_w + x];
                    px.0[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }
        Ok(DynamicImage::ImageRgb8(out))
    }

    #[cfg(not(feature = "ai"))]
    pub(crate) fn run(&self, _image: &DynamicImage) -> Result<DynamicImage, UpscaleError> {
        Err(UpscaleError::Inference(
            "inference support not compiled in".into(),
        ))
    }
}

#[cfg(feature = "ai")]
fn execution_provider_for(
    device: Device,
) -> Result<ort::execution_providers::ExecutionProviderDispatch, UpscaleError> {
    use ort::execution_providers::CPUExecutionProvider;

    match device {
        Device::Cpu => Ok(CPUExecutionProvider::default().build()),
        #[cfg(feature = "cuda")]
        Device::Cuda { ordinal } => {
            use ort::execution_providers::CUDAExecutionProvider;
            Ok(CUDAExecutionProvider::default()
                .with_device_id(ordinal as i32)
                .build()
                .error_on_failure())
        }
        #[cfg(feature = "directml")]
        Device::DirectMl { ordinal } => {
            use ort::execution_providers::DirectMLExecutionProvider;
            Ok(DirectMLExecutionProvider::default()
                .with_device_id(ordinal as i32)
                .build()
                .error_on_failure())
        }
        #[allow(unreachable_patterns)]
        other => Err(UpscaleError::DeviceUnavailable(format!(
            "{other} support not compiled in"
        ))),
    }
}

/// Caches loaded models for one conversion run.
pub struct ModelCache {
    locator: ModelLocator,
    entries: Mutex<HashMap<(ScaleModel, Device), Arc<LoadedModel>>>,
    disabled: Mutex<HashSet<Device>>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("dir", &self.locator.dir())
            .finish_non_exhaustive()
    }
}

impl ModelCache {
    pub fn new(locator: ModelLocator) -> Self {
        Self {
            locator,
            entries: Mutex::new(HashMap::new()),
            disabled: Mutex::new(HashSet::new()),
        }
    }

    pub fn locator(&self) -> &ModelLocator {
        &self.locator
    }

    /// Get or load the model for a device.
    ///
    /// Loading happens under the entry lock, so concurrent pages asking for
    /// the same model wait for one load instead of racing. A failed load
    /// disables the device for the remainder of the run.
    pub(crate) fn acquire(
        &self,
        model: ScaleModel,
        device: Device,
    ) -> Result<Arc<LoadedModel>, UpscaleError> {
        if self.is_disabled(device) {
            return Err(UpscaleError::DeviceUnavailable(format!(
                "{device} disabled after an earlier failure"
            )));
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| UpscaleError::ModelLoad("model cache poisoned".into()))?;
        if let Some(loaded) = entries.get(&(model, device)) {
            return Ok(Arc::clone(loaded));
        }

        match LoadedModel::load(&self.locator, model, device) {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                entries.insert((model, device), Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(err) => {
                warn!(?model, %device, %err, "model load failed, disabling device");
                if let Ok(mut disabled) = self.disabled.lock() {
                    disabled.insert(device);
                }
                Err(err)
            }
        }
    }

    /// Drop one cached entry, releasing its session memory.
    pub fn evict(&self, model: ScaleModel, device: Device) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(&(model, device)).is_some() {
                debug!(?model, %device, "model evicted");
            }
        }
    }

    pub fn is_disabled(&self, device: Device) -> bool {
        self.disabled
            .lock()
            .map(|d| d.contains(&device))
            .unwrap_or(false)
    }

    /// Explicit teardown: drop every cached session.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let count = entries.len();
            entries.clear();
            if count > 0 {
                debug!(count, "model cache cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cache() -> (tempfile::TempDir, ModelCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(ModelLocator::from_dir(dir.path()));
        (dir, cache)
    }

    #[test]
    fn acquire_without_model_file_disables_device() {
        let (_dir, cache) = empty_cache();
        assert!(cache
            .acquire(ScaleModel::RealEsrganX4, Device::Cpu)
            .is_err());
        assert!(cache.is_disabled(Device::Cpu));
    }

    #[test]
    fn disabled_device_short_circuits() {
        let (_dir, cache) = empty_cache();
        let _ = cache.acquire(ScaleModel::RealEsrganX4, Device::Cpu);
        // Second acquire fails fast with a device-unavailable error.
        match cache.acquire(ScaleModel::RealEsrganX2, Device::Cpu) {
            Err(UpscaleError::DeviceUnavailable(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn clear_and_evict_are_safe_on_empty_cache() {
        let (_dir, cache) = empty_cache();
        cache.evict(ScaleModel::RealEsrganX2, Device::Cpu);
        cache.clear();
    }

    #[test]
    fn disable_is_per_device() {
        let (_dir, cache) = empty_cache();
        let _ = cache.acquire(ScaleModel::RealEsrganX4, Device::Cuda { ordinal: 0 });
        assert!(cache.is_disabled(Device::Cuda { ordinal: 0 }));
        assert!(!cache.is_disabled(Device::Cpu));
    }
}
