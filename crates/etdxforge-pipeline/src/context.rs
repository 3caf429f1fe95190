// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run context: the resources one conversion run owns.

use std::sync::Arc;

use etdxforge_core::{Device, ExecutionContext};
use etdxforge_upscale::{DeviceProbe, ModelCache, ModelLocator, SystemProbe};
use tracing::debug;

use crate::executor::CancelFlag;

/// Everything a conversion run needs beyond its config: environment
/// capabilities, the model cache, the device probe, and cancellation.
///
/// The cache lives exactly as long as the context; `shutdown()` (also run
/// on drop) releases every loaded model.
pub struct RunContext {
    execution: ExecutionContext,
    cache: Arc<ModelCache>,
    probe: Arc<dyn DeviceProbe>,
    cancel: CancelFlag,
}

impl RunContext {
    /// Context with system defaults: hardware probing and models in the
    /// per-user cache directory.
    pub fn new(execution: ExecutionContext) -> Self {
        Self::with_parts(
            execution,
            ModelCache::new(ModelLocator::system_default()),
            Arc::new(SystemProbe),
        )
    }

    /// Context with an explicit cache and probe, for embedding and tests.
    pub fn with_parts(
        execution: ExecutionContext,
        cache: ModelCache,
        probe: Arc<dyn DeviceProbe>,
    ) -> Self {
        Self {
            execution,
            cache: Arc::new(cache),
            probe,
            cancel: CancelFlag::new(),
        }
    }

    pub fn execution(&self) -> ExecutionContext {
        self.execution
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn probe(&self) -> &Arc<dyn DeviceProbe> {
        &self.probe
    }

    /// Flag shared with callers that want to cancel a running conversion.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Devices a front end can offer for explicit selection.
    pub fn available_devices(&self) -> Vec<Device> {
        self.probe.available_devices()
    }

    /// Release every loaded model.
    pub fn shutdown(&self) {
        debug!("run context shutting down");
        self.cache.clear();
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etdxforge_upscale::FixedProbe;

    #[test]
    fn available_devices_come_from_the_probe() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::with_parts(
            ExecutionContext::default(),
            ModelCache::new(ModelLocator::from_dir(dir.path())),
            Arc::new(FixedProbe::new(vec![
                Device::Cuda { ordinal: 0 },
                Device::Cpu,
            ])),
        );
        assert_eq!(
            ctx.available_devices(),
            vec![Device::Cuda { ordinal: 0 }, Device::Cpu]
        );
    }

    #[test]
    fn cancel_flag_is_shared() {
        let ctx = RunContext::new(ExecutionContext::default());
        let flag = ctx.cancel_flag();
        assert!(!flag.is_cancelled());
        ctx.cancel_flag().cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let ctx = RunContext::new(ExecutionContext::default());
        ctx.shutdown();
        ctx.shutdown();
    }
}
