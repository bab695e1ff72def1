//! Partition-parallel integration passes.
//!
//! Both entry points follow the same shape: select the trees whose cached
//! elements went stale, empty exactly those, then fan the event walk out
//! over data partitions. Each worker refreshes its own status table, folds
//! amplitudes into a private scratch copy and hands it back; scratch
//! copies are merged into the caller's integral in partition order, so the
//! result does not depend on worker scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pwa_core::{CalculationStatus, Complex64, FourVector, PwaError};
use pwa_data::{partition_block, DataPartition, StatusTable};
use pwa_model::Model;

use crate::model_integral::ModelIntegral;
use crate::tree_integral::{integral_error, ContextExt};

/// Options governing an integration pass.
#[derive(Debug, Clone)]
pub struct IntegrationOpts {
    /// Worker threads the pass fans out to.
    pub threads: usize,
    /// Cooperative cancellation flag, checked between events.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for IntegrationOpts {
    fn default() -> Self {
        Self {
            threads: 1,
            cancel: None,
        }
    }
}

fn default_batches() -> usize {
    4
}

fn default_batch_size() -> usize {
    256
}

/// Batching options for generator-driven integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOpts {
    /// Number of batches drawn from the generator.
    #[serde(default = "default_batches")]
    pub batches: usize,
    /// Trials per batch; rejected trials still count against the batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for GeneratorOpts {
    fn default() -> Self {
        Self {
            batches: default_batches(),
            batch_size: default_batch_size(),
        }
    }
}

/// Outcome of one integration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationPass {
    /// Events folded into the refreshed elements.
    pub events: u64,
    /// Generator trials dropped before entering a batch.
    pub rejected: u64,
    /// Partitions the pass fanned out to.
    pub partitions: usize,
    /// Labels of the trees whose elements were recomputed, in matrix order.
    pub refreshed: Vec<String>,
}

/// Trees whose cached elements must be recomputed this pass.
///
/// A tree is stale when the combined variable status of its data-dependent
/// part changed, or when its elements have never seen an event.
struct StaleSelection {
    masks: Vec<Vec<bool>>,
    refreshed: Vec<String>,
}

impl StaleSelection {
    fn of(model: &Model, integral: &ModelIntegral) -> Result<Self, PwaError> {
        let mut masks = Vec::with_capacity(integral.components().len());
        let mut refreshed = Vec::new();
        for component in integral.components() {
            let matrix = component.integral();
            let mut mask = Vec::with_capacity(matrix.n_trees());
            for (position, &tree) in matrix.trees().iter().enumerate() {
                let stale = model.tree_variable_status(tree)?.is_changed()
                    || matrix.diagonal(position)?.is_empty();
                if stale {
                    refreshed.push(model.tree(tree)?.label().to_string());
                }
                mask.push(stale);
            }
            masks.push(mask);
        }
        Ok(Self { masks, refreshed })
    }

    fn is_empty(&self) -> bool {
        self.masks
            .iter()
            .all(|mask| mask.iter().all(|&stale| !stale))
    }

    fn reset(&self, integral: &mut ModelIntegral) -> Result<(), PwaError> {
        for (component, mask) in integral.components_mut().iter_mut().zip(&self.masks) {
            for (position, &stale) in mask.iter().enumerate() {
                if stale {
                    component.integral_mut().reset_tree(position)?;
                }
            }
        }
        Ok(())
    }
}

/// Everything a worker needs, fixed for the lifetime of one pass.
struct PassContext<'a> {
    model: &'a Model,
    template: ModelIntegral,
    selection: StaleSelection,
    cancel: Option<&'a AtomicBool>,
}

fn build_pool(opts: &IntegrationOpts) -> Result<rayon::ThreadPool, PwaError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads.max(1))
        .build()
        .map_err(|err| integral_error("thread-pool", err.to_string()))
}

fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<(), PwaError> {
    if let Some(flag) = cancel {
        if flag.load(Ordering::Relaxed) {
            return Err(integral_error(
                "cancelled",
                "integration cancelled by the caller",
            ));
        }
    }
    Ok(())
}

/// Integrates stored data, refreshing only the stale elements.
///
/// Partition and table pairing must stay consistent across calls; settled
/// trees keep their cached elements, so a pass after a pure free-amplitude
/// or admixture move walks no events at all.
pub fn calculate_partitions(
    model: &Model,
    integral: &mut ModelIntegral,
    partitions: &mut [DataPartition<'_>],
    tables: &mut [StatusTable],
    opts: &IntegrationOpts,
) -> Result<IntegrationPass, PwaError> {
    integral.check_model(model)?;
    if partitions.is_empty() {
        return Err(integral_error(
            "no-partitions",
            "integration needs at least one partition",
        ));
    }
    if partitions.len() != tables.len() {
        return Err(integral_error(
            "partition-table-count",
            "one status table per partition is required",
        )
        .with_context("partitions", partitions.len())
        .with_context("tables", tables.len()));
    }
    let selection = StaleSelection::of(model, integral)?;
    if selection.is_empty() {
        return Ok(IntegrationPass {
            events: 0,
            rejected: 0,
            partitions: partitions.len(),
            refreshed: Vec::new(),
        });
    }
    selection.reset(integral)?;
    let context = PassContext {
        model,
        template: integral.zeroed(),
        selection,
        cancel: opts.cancel.as_deref(),
    };
    let pool = build_pool(opts)?;
    let events = run_partitions(&context, integral, partitions, tables, &pool)?;
    Ok(IntegrationPass {
        events,
        rejected: 0,
        partitions: partitions.len(),
        refreshed: context.selection.refreshed,
    })
}

/// Integrates freshly generated events in batches.
///
/// `generate` is handed the global trial index and returns the final-state
/// momenta of one event, or `None` to drop the trial. Each batch reuses the
/// same data set and status tables; batches are partitioned across the
/// worker threads and merged in order like stored-data passes.
pub fn calculate_from_generator<G>(
    model: &Model,
    integral: &mut ModelIntegral,
    mut generate: G,
    batching: &GeneratorOpts,
    opts: &IntegrationOpts,
) -> Result<IntegrationPass, PwaError>
where
    G: FnMut(u64) -> Option<Vec<FourVector>>,
{
    integral.check_model(model)?;
    if batching.batches == 0 {
        return Err(integral_error("no-batches", "at least one batch is required"));
    }
    if batching.batch_size == 0 {
        return Err(integral_error(
            "empty-batch",
            "a batch needs at least one trial",
        ));
    }
    let workers = opts.threads.max(1);
    let selection = StaleSelection::of(model, integral)?;
    if selection.is_empty() {
        return Ok(IntegrationPass {
            events: 0,
            rejected: 0,
            partitions: workers,
            refreshed: Vec::new(),
        });
    }
    selection.reset(integral)?;
    let context = PassContext {
        model,
        template: integral.zeroed(),
        selection,
        cancel: opts.cancel.as_deref(),
    };
    let pool = build_pool(opts)?;

    let mut data = model.new_data_set()?;
    let mut seed_table = model.new_status_table()?;
    let mut tables = Vec::with_capacity(workers);
    for _ in 0..workers {
        tables.push(model.new_status_table()?);
    }

    let mut events = 0u64;
    let mut rejected = 0u64;
    let mut trial = 0u64;
    for _ in 0..batching.batches {
        data.clear();
        for _ in 0..batching.batch_size {
            check_cancelled(context.cancel)?;
            match generate(trial) {
                Some(momenta) => {
                    model.add_event(&mut data, &momenta, &mut seed_table)?;
                }
                None => rejected += 1,
            }
            trial += 1;
        }
        if data.is_empty() {
            continue;
        }
        // The batch replaced every event, so cached entries are void.
        for table in &mut tables {
            table.set_all_calculation(CalculationStatus::Uncalculated);
        }
        let mut partitions = partition_block(&mut data, workers)?;
        let used = partitions.len();
        events += run_partitions(
            &context,
            integral,
            &mut partitions,
            &mut tables[..used],
            &pool,
        )?;
    }
    Ok(IntegrationPass {
        events,
        rejected,
        partitions: workers,
        refreshed: context.selection.refreshed,
    })
}

fn run_partitions(
    context: &PassContext<'_>,
    integral: &mut ModelIntegral,
    partitions: &mut [DataPartition<'_>],
    tables: &mut [StatusTable],
    pool: &rayon::ThreadPool,
) -> Result<u64, PwaError> {
    let mut jobs: Vec<(&mut DataPartition<'_>, &mut StatusTable)> =
        partitions.iter_mut().zip(tables.iter_mut()).collect();
    let results: Result<Vec<(usize, ModelIntegral, u64)>, PwaError> = pool.install(|| {
        jobs.par_iter_mut()
            .enumerate()
            .map(
                |(index, (partition, table))| -> Result<(usize, ModelIntegral, u64), PwaError> {
                    let scratch = integrate_partition(context, partition, table)?;
                    Ok((index, scratch, partition.len() as u64))
                },
            )
            .collect()
    });
    let mut ordered = results?;
    ordered.sort_by_key(|(index, _, _)| *index);
    let mut events = 0;
    for (_, scratch, walked) in ordered {
        integral.merge(&scratch)?;
        events += walked;
    }
    Ok(events)
}

fn integrate_partition(
    context: &PassContext<'_>,
    partition: &mut DataPartition<'_>,
    table: &mut StatusTable,
) -> Result<ModelIntegral, PwaError> {
    context.model.calculate(partition, table)?;
    let mut scratch = context.template.clone();
    let mut amplitudes: Vec<Complex64> = Vec::new();
    for event in partition.events() {
        check_cancelled(context.cancel)?;
        for (component, mask) in scratch
            .components_mut()
            .iter_mut()
            .zip(&context.selection.masks)
        {
            if !mask.iter().any(|&stale| stale) {
                continue;
            }
            let matrix = component.integral_mut();
            amplitudes.clear();
            for &tree in matrix.trees() {
                amplitudes.push(context.model.tree_data_amplitude(event, tree)?);
            }
            matrix.accumulate_masked(&amplitudes, mask)?;
        }
    }
    Ok(scratch)
}
