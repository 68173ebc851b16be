//! # Aggregation Orchestrator
//!
//! Drives whole-life and embodied carbon aggregation over collections of
//! top-level calculators, either sequentially or fanned out over a bounded
//! worker pool.
//!
//! ## Concurrency
//!
//! - The pool is built once per [`CalculationService`] with at most
//!   `max_tasks` worker threads, however many entities are aggregated.
//! - Each task reads only its own entity subtree and returns its partial
//!   result. Partial results are collected in input order and summed on the
//!   calling thread, so the concurrent total is the sequential total.
//! - The caller blocks until every task has finished. A panicking task
//!   surfaces as [`CarbonError::AggregationFailed`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use carbon_core::entities::{Assembly, Material};
//! use carbon_core::indicator::PhaseIndicator;
//! use carbon_core::orchestrator::CalculationService;
//! use carbon_core::phases::Phase;
//!
//! let timber = Arc::new(Material::new("CLT", PhaseIndicator::default().with(Phase::A1, 12.0)).unwrap());
//! let floors: Vec<Assembly> = (0..4)
//!     .map(|i| Assembly::new(format!("Floor {}", i)).unwrap().with_material(timber.clone()))
//!     .collect();
//!
//! let service = CalculationService::new(2).unwrap();
//! let sequential = service.compute_whole_life_carbon_sync(&floors);
//! let concurrent = service.compute_total_carbon_concurrent(&floors).unwrap();
//! assert_eq!(sequential, 48.0);
//! assert_eq!(concurrent, sequential);
//! ```

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::calculator::{CarbonCalculator, EmbodiedCarbonCalculator};
use crate::errors::{CarbonError, CarbonResult};
use crate::phases::PhaseSelection;
use crate::settings::{CarbonSettings, NamePolicy};

/// Sequential and concurrent aggregation over top-level calculators.
pub struct CalculationService {
    max_tasks: usize,
    policy: NamePolicy,
    pool: ThreadPool,
}

impl std::fmt::Debug for CalculationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculationService")
            .field("max_tasks", &self.max_tasks)
            .field("policy", &self.policy)
            .finish()
    }
}

impl CalculationService {
    /// Service with a worker pool of `max_tasks` threads and the lenient
    /// name policy.
    pub fn new(max_tasks: usize) -> CarbonResult<Self> {
        if max_tasks == 0 {
            return Err(CarbonError::invalid_input(
                "max_parallel_tasks",
                "0",
                "At least one worker is required",
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(max_tasks)
            .thread_name(|i| format!("carbon-agg-{}", i))
            .build()
            .map_err(|e| CarbonError::aggregation_failed(format!("worker pool: {}", e)))?;

        Ok(CalculationService {
            max_tasks,
            policy: NamePolicy::default(),
            pool,
        })
    }

    /// Service configured from inventory settings
    pub fn from_settings(settings: &CarbonSettings) -> CarbonResult<Self> {
        settings.validate()?;
        Ok(CalculationService::new(settings.max_parallel_tasks)?.with_policy(settings.name_policy))
    }

    pub fn with_policy(mut self, policy: NamePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    /// Sum of whole-life carbon, in input order, on the calling thread.
    pub fn compute_whole_life_carbon_sync<T: CarbonCalculator>(&self, entities: &[T]) -> f64 {
        let total: f64 = entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let contribution = entity.compute_whole_life_carbon();
                tracing::trace!(index, contribution, "whole-life contribution");
                contribution
            })
            .sum();
        tracing::debug!(entities = entities.len(), total, "sequential whole-life aggregation");
        total
    }

    /// Sum of embodied carbon, in input order. Stops at the first failure.
    ///
    /// Each entity stores its derived envelope areas as a side effect.
    pub fn compute_embodied_carbon_sync<T: EmbodiedCarbonCalculator>(&self, entities: &mut [T]) -> CarbonResult<f64> {
        let mut total = 0.0;
        for (index, entity) in entities.iter_mut().enumerate() {
            let contribution = entity.calculate_embodied_carbon()?;
            tracing::trace!(index, contribution, "embodied contribution");
            total += contribution;
        }
        tracing::debug!(entities = entities.len(), total, "sequential embodied aggregation");
        Ok(total)
    }

    /// Fan-out/fan-in whole-life aggregation: one task per entity.
    pub fn compute_total_carbon_concurrent<T>(&self, entities: &[T]) -> CarbonResult<f64>
    where
        T: CarbonCalculator + Sync,
    {
        let partials = self.fan_out(|| {
            entities
                .par_iter()
                .map(|entity| entity.compute_whole_life_carbon())
                .collect::<Vec<f64>>()
        })?;
        let total: f64 = partials.iter().sum();
        tracing::debug!(
            entities = entities.len(),
            workers = self.max_tasks,
            total,
            "concurrent whole-life aggregation"
        );
        Ok(total)
    }

    /// Fan-out/fan-in phase-filtered aggregation.
    ///
    /// Names are resolved once, under this service's policy, before any task
    /// starts.
    pub fn carbon_for_phase_concurrent<T, S>(&self, entities: &[T], phases: &[S]) -> CarbonResult<f64>
    where
        T: CarbonCalculator + Sync,
        S: AsRef<str>,
    {
        let selection = PhaseSelection::from_names(phases, self.policy)?;
        let partials = self.fan_out(|| {
            entities
                .par_iter()
                .map(|entity| entity.carbon_for_selection(&selection))
                .collect::<Vec<f64>>()
        })?;
        let total: f64 = partials.iter().sum();
        tracing::debug!(entities = entities.len(), total, "concurrent phase aggregation");
        Ok(total)
    }

    /// Fan-out/fan-in embodied aggregation: one task per distinct entity.
    ///
    /// Every entity is processed. If any fail, the error of the first failing
    /// entity in input order is returned.
    pub fn compute_embodied_carbon_concurrent<T>(&self, entities: &mut [T]) -> CarbonResult<f64>
    where
        T: EmbodiedCarbonCalculator + Send,
    {
        let count = entities.len();
        let results = self.fan_out(|| {
            entities
                .par_iter_mut()
                .map(|entity| entity.calculate_embodied_carbon())
                .collect::<Vec<CarbonResult<f64>>>()
        })?;
        let partials = results.into_iter().collect::<CarbonResult<Vec<f64>>>()?;
        let total: f64 = partials.iter().sum();
        tracing::debug!(entities = count, total, "concurrent embodied aggregation");
        Ok(total)
    }

    /// Run a parallel job on the pool and wait for it.
    fn fan_out<R, F>(&self, job: F) -> CarbonResult<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        panic::catch_unwind(AssertUnwindSafe(|| self.pool.install(job))).map_err(|cause| {
            let reason = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker task panicked".to_string());
            tracing::warn!(%reason, "aggregation task failed");
            CarbonError::aggregation_failed(reason)
        })
    }
}
