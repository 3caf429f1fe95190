// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device discovery and selection.
//
// Discovery is behind the `DeviceProbe` trait so that selection and
// fallback logic stay deterministic under test: a `FixedProbe` stands in
// for real hardware.

use etdxforge_core::{Device, DevicePreference};
use tracing::debug;

/// Enumerates inference devices. Implementations must be cheap enough to
/// call once per conversion run.
pub trait DeviceProbe: Send + Sync {
    /// Usable devices, best first. CPU is always present and always last.
    fn available_devices(&self) -> Vec<Device>;
}

/// Probe backed by the ONNX Runtime execution providers compiled into this
/// build. Without the `ai` feature only the CPU is reported.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn available_devices(&self) -> Vec<Device> {
        let mut devices = Vec::new();
        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
            if CUDAExecutionProvider::default().is_available().unwrap_or(false) {
                devices.push(Device::Cuda { ordinal: 0 });
            }
        }
        #[cfg(all(feature = "directml", target_os = "windows"))]
        {
            use ort::execution_providers::{DirectMLExecutionProvider, ExecutionProvider};
            if DirectMLExecutionProvider::default()
                .is_available()
                .unwrap_or(false)
            {
                devices.push(Device::DirectMl { ordinal: 0 });
            }
        }
        devices.push(Device::Cpu);
        devices
    }
}

/// Probe returning a fixed device list, for tests.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    devices: Vec<Device>,
}

impl FixedProbe {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn cpu_only() -> Self {
        Self::new(vec![Device::Cpu])
    }
}

impl DeviceProbe for FixedProbe {
    fn available_devices(&self) -> Vec<Device> {
        self.devices.clone()
    }
}

/// Pick the device a run should try first.
///
/// `Auto` takes the first (best) available device. An explicit device is
/// used verbatim, whether or not the probe lists it; if it cannot load a
/// model the strategy chain falls back from there.
pub fn select_device(preference: &DevicePreference, available: &[Device]) -> Device {
    let selected = match preference {
        DevicePreference::Explicit(device) => *device,
        DevicePreference::Auto => *available.first().unwrap_or(&Device::Cpu),
    };
    debug!(device = %selected, "inference device selected");
    selected
}
