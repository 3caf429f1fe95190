// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page task executor: a fixed rayon pool with isolated per-page failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use etdxforge_core::{ConvertError, PageError};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Cooperative cancellation, checked when a worker picks up a page.
/// In-flight pages run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run `task` over every `(index, input)` pair, collecting one result per
/// page in ascending index order.
///
/// A panic inside `task` is not caught; per-page failures are expressed as
/// `Err(PageError)` results. With `parallel` set and more than one page,
/// work runs on a dedicated pool sized to the page count capped at the CPU
/// count; if the pool cannot be built the run degrades to sequential.
pub fn run_pages<I, O, F>(
    inputs: Vec<(usize, I)>,
    parallel: bool,
    cancel: &CancelFlag,
    task: F,
) -> Vec<Result<O, PageError>>
where
    I: Send,
    O: Send,
    F: Fn(usize, I) -> Result<O, PageError> + Send + Sync,
{
    let run_one = |(index, input): (usize, I)| -> (usize, Result<O, PageError>) {
        if cancel.is_cancelled() {
            return (index, Err(PageError::new(index, ConvertError::Cancelled)));
        }
        (index, task(index, input))
    };

    let mut results: Vec<(usize, Result<O, PageError>)> = if parallel && inputs.len() > 1 {
        let threads = num_cpus::get().min(inputs.len());
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => {
                debug!(threads, pages = inputs.len(), "running pages in parallel");
                pool.install(|| inputs.into_par_iter().map(run_one).collect())
            }
            Err(err) => {
                warn!(%err, "worker pool unavailable, running sequentially");
                inputs.into_iter().map(run_one).collect()
            }
        }
    } else {
        inputs.into_iter().map(run_one).collect()
    };

    // Completion order is unspecified; output order is by page index.
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn results_are_ordered_by_index() {
        let inputs: Vec<(usize, u32)> = (0..16).map(|i| (i, i as u32)).collect();
        let results = run_pages(inputs, true, &CancelFlag::new(), |index, value| {
            // Stagger completions so parallel workers finish out of order.
            std::thread::sleep(std::time::Duration::from_millis((16 - index as u64) % 5));
            Ok(value * 2)
        });
        let values: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..16).map(|i| i * 2).collect::<Vec<u32>>());
    }

    #[test]
    fn one_failure_does_not_abort_siblings() {
        let inputs: Vec<(usize, ())> = (0..4).map(|i| (i, ())).collect();
        let results = run_pages(inputs, true, &CancelFlag::new(), |index, ()| {
            if index == 2 {
                Err(PageError::new(
                    index,
                    ConvertError::Image("synthetic failure".into()),
                ))
            } else {
                Ok(index)
            }
        });
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert_eq!(results[2].as_ref().unwrap_err().index, 2);
        assert!(results[3].is_ok());
    }

    #[test]
    fn sequential_mode_preserves_submission_order() {
        let seen = AtomicUsize::new(0);
        let inputs: Vec<(usize, ())> = (0..8).map(|i| (i, ())).collect();
        let results = run_pages(inputs, false, &CancelFlag::new(), |index, ()| {
            // Sequential execution visits indices in order.
            assert_eq!(seen.fetch_add(1, Ordering::SeqCst), index);
            Ok(index)
        });
        assert_eq!(results.len(), 8);
    }

    #[test]
    fn cancellation_marks_unstarted_pages() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let inputs: Vec<(usize, ())> = (0..3).map(|i| (i, ())).collect();
        let results = run_pages(inputs, false, &cancel, |index, ()| Ok(index));
        for result in &results {
            assert!(matches!(
                result.as_ref().unwrap_err().error,
                ConvertError::Cancelled
            ));
        }
    }

    #[test]
    fn single_page_runs_without_a_pool() {
        let results = run_pages(vec![(0, 41u32)], true, &CancelFlag::new(), |_, v| Ok(v + 1));
        assert_eq!(results[0].as_ref().unwrap(), &42);
    }
}
