//! Model assembly, locking and evaluation.
//!
//! A model is assembled open: components are declared, decay trees built and
//! groupings interned. `lock` walks every root tree, registers the groupings
//! each factor is evaluated on, prunes accessors to full-final-state
//! lineages, sweeps the cache and freezes the registry into its storage
//! layout. From then on the structure is immutable; only parameter values
//! move. Evaluation is split between the batched `calculate` pass, which
//! refreshes stale cached entries for a partition, and the per-event
//! amplitude reads built on top of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use pwa_combin::{GroupingCache, GroupingHandle, ParticleIndex};
use pwa_core::{
    combine_variable_status, Complex64, ConsistencyReport, ErrorInfo, FourVector, ParameterStore,
    PwaError, VariableStatus,
};
use pwa_data::{AccessorRegistry, DataPartition, DataSet, EventData, StatusTable, StorageLayout};

use crate::component::{AmplitudeComponent, AmplitudeId, KinematicComponent};
use crate::decay_tree::{CoherentSum, DecayTree, DecayTreeId};
use crate::kahan::KahanSum;
use crate::momenta::MomentaAccessor;

fn model_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Model(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
    fn with_hint(self, hint: impl Into<String>) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Model(info) => PwaError::Model(info.with_context(key, value.to_string())),
            other => other,
        }
    }

    fn with_hint(self, hint: impl Into<String>) -> PwaError {
        match self {
            PwaError::Model(info) => PwaError::Model(info.with_hint(hint)),
            other => other,
        }
    }
}

/// An incremental-calculation model over decay trees.
///
/// Owns the grouping cache, the accessor registry, the parameter store and
/// the declared components. The lock state machine has exactly two states;
/// structural mutation is refused once locked, evaluation is refused while
/// open.
pub struct Model {
    cache: GroupingCache,
    registry: AccessorRegistry,
    params: ParameterStore,
    n_final: usize,
    momenta: MomentaAccessor,
    kinematics: Vec<Box<dyn KinematicComponent>>,
    amplitudes: Vec<Box<dyn AmplitudeComponent>>,
    trees: Vec<DecayTree>,
    sums: Vec<CoherentSum>,
    locked: bool,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("n_final", &self.n_final)
            .field("locked", &self.locked)
            .field("kinematics", &self.kinematics.len())
            .field("amplitudes", &self.amplitudes.len())
            .field("trees", &self.trees)
            .field("sums", &self.sums)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates an open model for an `n_final`-particle final state.
    ///
    /// The final-state leaves are interned up front and the four-momenta
    /// accessor is declared as the first kinematic component.
    pub fn new(n_final: usize) -> Result<Self, PwaError> {
        if !(2..=256).contains(&n_final) {
            return Err(model_error(
                "final-state-size",
                "final state must have between 2 and 256 particles",
            )
            .with_context("n_final", n_final));
        }
        let mut cache = GroupingCache::new();
        for index in 0..n_final {
            cache.intern_final_state(ParticleIndex::from_raw(index as u8));
        }
        let mut registry = AccessorRegistry::new();
        let momenta = MomentaAccessor::declare(&mut registry)?;
        let kinematics: Vec<Box<dyn KinematicComponent>> = vec![Box::new(momenta)];
        Ok(Self {
            cache,
            registry,
            params: ParameterStore::new(),
            n_final,
            momenta,
            kinematics,
            amplitudes: Vec::new(),
            trees: Vec::new(),
            sums: Vec::new(),
            locked: false,
        })
    }

    /// Number of final-state particles.
    pub fn n_final(&self) -> usize {
        self.n_final
    }

    /// Returns true once [`Model::lock`] has run.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The grouping cache.
    pub fn cache(&self) -> &GroupingCache {
        &self.cache
    }

    /// The accessor registry.
    pub fn registry(&self) -> &AccessorRegistry {
        &self.registry
    }

    /// The parameter store.
    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// Mutable access to parameter values; allowed in both lock states.
    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    /// The model's four-momenta accessor.
    pub fn momenta(&self) -> &MomentaAccessor {
        &self.momenta
    }

    /// All declared decay trees, root or daughter.
    pub fn trees(&self) -> &[DecayTree] {
        &self.trees
    }

    /// One decay tree.
    pub fn tree(&self, id: DecayTreeId) -> Result<&DecayTree, PwaError> {
        self.trees.get(id.as_raw() as usize).ok_or_else(|| {
            model_error("unknown-tree", "decay tree does not exist")
                .with_context("tree", id.as_raw())
        })
    }

    /// The coherent sums formed at lock, empty while open.
    pub fn sums(&self) -> &[CoherentSum] {
        &self.sums
    }

    /// One declared amplitude component.
    pub fn amplitude_component(
        &self,
        id: AmplitudeId,
    ) -> Result<&dyn AmplitudeComponent, PwaError> {
        self.amplitudes
            .get(id.as_raw() as usize)
            .map(|component| component.as_ref())
            .ok_or_else(|| {
                model_error("unknown-amplitude", "amplitude component does not exist")
                    .with_context("component", id.as_raw())
            })
    }

    fn ensure_open(&self) -> Result<(), PwaError> {
        if self.locked {
            return Err(model_error("model-locked", "structure is frozen after lock")
                .with_hint("declare trees and components before locking"));
        }
        Ok(())
    }

    fn ensure_locked(&self) -> Result<(), PwaError> {
        if !self.locked {
            return Err(model_error("model-open", "lock the model before evaluating")
                .with_hint("call lock once assembly is complete"));
        }
        Ok(())
    }

    /// Split borrows for declaring components: the grouping cache, the open
    /// registry, the parameter store and the momenta accessor.
    pub fn declare_parts(
        &mut self,
    ) -> Result<
        (
            &mut GroupingCache,
            &mut AccessorRegistry,
            &mut ParameterStore,
            &MomentaAccessor,
        ),
        PwaError,
    > {
        self.ensure_open()?;
        Ok((
            &mut self.cache,
            &mut self.registry,
            &mut self.params,
            &self.momenta,
        ))
    }

    /// Adds a kinematic component to the per-event seeding pass.
    pub fn add_kinematic_component(
        &mut self,
        component: Box<dyn KinematicComponent>,
    ) -> Result<(), PwaError> {
        self.ensure_open()?;
        self.kinematics.push(component);
        Ok(())
    }

    /// Adds an amplitude component and returns its identifier.
    pub fn add_amplitude_component(
        &mut self,
        component: Box<dyn AmplitudeComponent>,
    ) -> Result<AmplitudeId, PwaError> {
        self.ensure_open()?;
        let id = AmplitudeId::from_raw(self.amplitudes.len() as u32);
        self.amplitudes.push(component);
        Ok(id)
    }

    /// Declares a decay tree with a unit free amplitude.
    ///
    /// `two_m` is twice the spin projection of the decaying state; trees
    /// sharing it end up in the same coherent sum at lock.
    pub fn add_decay_tree(
        &mut self,
        label: impl Into<String>,
        two_m: i32,
    ) -> Result<DecayTreeId, PwaError> {
        self.ensure_open()?;
        let label = label.into();
        let free = self
            .params
            .add_complex(format!("{label}.amplitude"), Complex64::new(1.0, 0.0));
        let id = DecayTreeId::from_raw(self.trees.len() as u32);
        self.trees.push(DecayTree::new(label, free, two_m));
        Ok(id)
    }

    /// Attaches a grouping the tree is evaluated on.
    pub fn add_tree_top(&mut self, id: DecayTreeId, top: GroupingHandle) -> Result<(), PwaError> {
        self.ensure_open()?;
        if self.cache.grouping(top)?.is_final_state() {
            return Err(model_error(
                "top-not-composite",
                "a tree cannot be evaluated on a single final-state particle",
            )
            .with_context("grouping", top.as_raw()));
        }
        let tree = self.tree(id)?;
        if tree.tops().contains(&top) {
            return Err(model_error("duplicate-top", "grouping already attached to this tree")
                .with_context("tree", tree.label())
                .with_context("grouping", top.as_raw()));
        }
        let label = tree.label().to_string();
        let factors = tree.factors().to_vec();
        for factor in factors {
            let component = self.amplitude_component(factor)?;
            if !component.valid_for(&self.cache, top)? {
                return Err(model_error(
                    "factor-mismatch",
                    "an attached component cannot be evaluated on this grouping",
                )
                .with_context("tree", &label)
                .with_context("component", component.label()));
            }
        }
        self.tree_mut(id)?.push_top(top);
        Ok(())
    }

    /// Attaches an amplitude component as a factor of the tree.
    pub fn add_tree_factor(
        &mut self,
        id: DecayTreeId,
        factor: AmplitudeId,
    ) -> Result<(), PwaError> {
        self.ensure_open()?;
        let component = self.amplitude_component(factor)?;
        let tree = self.tree(id)?;
        for &top in tree.tops() {
            if !component.valid_for(&self.cache, top)? {
                return Err(model_error(
                    "factor-mismatch",
                    "component cannot be evaluated on an attached grouping",
                )
                .with_context("tree", tree.label())
                .with_context("component", component.label()));
            }
        }
        self.tree_mut(id)?.push_factor(factor);
        Ok(())
    }

    /// Attaches a daughter tree at a daughter position of the tree's tops.
    pub fn add_tree_daughter(
        &mut self,
        id: DecayTreeId,
        position: usize,
        daughter: DecayTreeId,
    ) -> Result<(), PwaError> {
        self.ensure_open()?;
        self.tree(daughter)?;
        let tree = self.tree(id)?;
        if tree.daughters().contains_key(&position) {
            return Err(model_error("daughter-taken", "daughter position already occupied")
                .with_context("tree", tree.label())
                .with_context("position", position));
        }
        for &top in tree.tops() {
            let available = self.cache.grouping(top)?.daughters().len();
            if position >= available {
                return Err(model_error(
                    "daughter-position",
                    "grouping has no daughter at this position",
                )
                .with_context("position", position)
                .with_context("available", available));
            }
        }
        if id == daughter || self.reaches(daughter, id)? {
            return Err(model_error("tree-cycle", "daughter link would close a cycle")
                .with_context("tree", id.as_raw())
                .with_context("daughter", daughter.as_raw()));
        }
        self.tree_mut(id)?.insert_daughter(position, daughter);
        Ok(())
    }

    fn tree_mut(&mut self, id: DecayTreeId) -> Result<&mut DecayTree, PwaError> {
        self.trees.get_mut(id.as_raw() as usize).ok_or_else(|| {
            model_error("unknown-tree", "decay tree does not exist")
                .with_context("tree", id.as_raw())
        })
    }

    fn reaches(&self, from: DecayTreeId, target: DecayTreeId) -> Result<bool, PwaError> {
        if from == target {
            return Ok(true);
        }
        let daughters: Vec<DecayTreeId> =
            self.tree(from)?.daughters().values().copied().collect();
        for daughter in daughters {
            if self.reaches(daughter, target)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Trees never referenced as a daughter, in declaration order.
    pub fn root_trees(&self) -> Vec<DecayTreeId> {
        let mut referenced = BTreeSet::new();
        for tree in &self.trees {
            for &daughter in tree.daughters().values() {
                referenced.insert(daughter);
            }
        }
        (0..self.trees.len())
            .map(|index| DecayTreeId::from_raw(index as u32))
            .filter(|id| !referenced.contains(id))
            .collect()
    }

    fn collect_tree_registrations(
        &self,
        id: DecayTreeId,
        handle: GroupingHandle,
        out: &mut Vec<(AmplitudeId, GroupingHandle)>,
    ) -> Result<(), PwaError> {
        let tree = self.tree(id)?;
        for &factor in tree.factors() {
            out.push((factor, handle));
        }
        let daughters: Vec<(usize, DecayTreeId)> = tree
            .daughters()
            .iter()
            .map(|(&position, &daughter)| (position, daughter))
            .collect();
        let slots = self.cache.grouping(handle)?.daughters().to_vec();
        for (position, daughter) in daughters {
            let sub = *slots.get(position).ok_or_else(|| {
                model_error("daughter-position", "grouping has no daughter at this position")
                    .with_context("position", position)
                    .with_context("available", slots.len())
            })?;
            self.collect_tree_registrations(daughter, sub, out)?;
        }
        Ok(())
    }

    /// Locks the model: registers every grouping the trees evaluate on,
    /// prunes and sweeps, freezes the storage layout and forms the coherent
    /// sums. Locking twice is a no-op.
    ///
    /// Solitary degrees of freedom are fixed here: the free amplitude of a
    /// sum with a single tree, and the admixture of a single-sum model.
    pub fn lock(&mut self) -> Result<(), PwaError> {
        if self.locked {
            return Ok(());
        }

        let roots = self.root_trees();
        let mut registrations: Vec<(AmplitudeId, GroupingHandle)> = Vec::new();
        let mut lineages: Vec<GroupingHandle> = Vec::new();
        for &root in &roots {
            let tree = self.tree(root)?;
            if tree.tops().is_empty() {
                return Err(model_error(
                    "tree-without-tops",
                    "a root tree has no grouping to be evaluated on",
                )
                .with_context("tree", tree.label()));
            }
            let tops = tree.tops().to_vec();
            for top in tops {
                lineages.push(top);
                self.collect_tree_registrations(root, top, &mut registrations)?;
            }
        }

        for handle in lineages {
            self.momenta
                .register_grouping(&mut self.registry, &self.cache, handle)?;
        }
        for (factor, handle) in registrations {
            let component = self.amplitudes.get(factor.as_raw() as usize).ok_or_else(|| {
                model_error("unknown-amplitude", "amplitude component does not exist")
                    .with_context("component", factor.as_raw())
            })?;
            if !component.valid_for(&self.cache, handle)? {
                return Err(model_error(
                    "factor-mismatch",
                    "component cannot be evaluated on a daughter grouping",
                )
                .with_context("component", component.label())
                .with_context("grouping", handle.as_raw()));
            }
            if let Some(accessor) = component.accessor() {
                self.registry.register_grouping(accessor, &self.cache, handle)?;
            }
        }

        self.registry
            .prune_to_full_final_state(&self.cache, self.n_final)?;
        let tops = self.registry.registered_tops(&self.cache)?;
        self.cache.sweep(&tops)?;
        self.registry.lock(&self.cache)?;

        let mut by_projection: BTreeMap<i32, Vec<DecayTreeId>> = BTreeMap::new();
        for &root in &roots {
            let two_m = self.trees[root.as_raw() as usize].two_m();
            by_projection.entry(two_m).or_default().push(root);
        }
        for (two_m, members) in by_projection {
            let admixture = self
                .params
                .add_nonnegative(format!("admixture[2m={two_m}]"), 1.0)?;
            if let [solitary] = members.as_slice() {
                let free = self.trees[solitary.as_raw() as usize].free_amplitude();
                self.params.fix(free)?;
            }
            self.sums.push(CoherentSum::new(two_m, admixture, members));
        }
        if let [only] = self.sums.as_slice() {
            let admixture = only.admixture();
            self.params.fix(admixture)?;
        }

        // Stable, so components within a stage keep declaration order.
        self.kinematics.sort_by_key(|component| component.stage());

        self.locked = true;
        Ok(())
    }

    /// The storage layout frozen at lock.
    pub fn layout(&self) -> Result<Arc<StorageLayout>, PwaError> {
        self.registry.layout()
    }

    /// A data set shaped for the locked layout.
    pub fn new_data_set(&self) -> Result<DataSet, PwaError> {
        Ok(DataSet::new(self.layout()?))
    }

    /// A status table shaped for the locked layout, all entries stale.
    pub fn new_status_table(&self) -> Result<StatusTable, PwaError> {
        Ok(StatusTable::new(self.layout()?))
    }

    /// Appends an event, seeds its final-state momenta and runs the
    /// kinematic components in stage order. Returns the event's index.
    pub fn add_event(
        &self,
        data: &mut DataSet,
        momenta: &[FourVector],
        table: &mut StatusTable,
    ) -> Result<usize, PwaError> {
        self.ensure_locked()?;
        let layout = self.layout()?;
        if !Arc::ptr_eq(data.layout(), &layout) {
            return Err(model_error(
                "layout-mismatch",
                "data set belongs to a different storage layout",
            ));
        }
        if !Arc::ptr_eq(table.layout(), &layout) {
            return Err(model_error(
                "layout-mismatch",
                "status table belongs to a different storage layout",
            ));
        }
        if momenta.len() != self.n_final {
            return Err(model_error(
                "final-state-count",
                "event momentum count does not match the model",
            )
            .with_context("expected", self.n_final)
            .with_context("actual", momenta.len()));
        }
        let index = data.add_empty();
        let event = data.event_mut(index)?;
        self.momenta
            .set_final_state_momenta(&self.cache, &layout, momenta, event, table)?;
        let token = index as u64;
        for component in &self.kinematics {
            component.calculate_event(&self.cache, &layout, &self.params, token, event, table)?;
        }
        Ok(index)
    }

    /// Refreshes stale cached entries of every amplitude component for one
    /// partition: one staleness pass over the table, then batched component
    /// calculation.
    pub fn calculate(
        &self,
        partition: &mut DataPartition<'_>,
        table: &mut StatusTable,
    ) -> Result<(), PwaError> {
        self.ensure_locked()?;
        let layout = self.layout()?;
        if !Arc::ptr_eq(table.layout(), &layout) {
            return Err(model_error(
                "layout-mismatch",
                "status table belongs to a different storage layout",
            ));
        }
        table.update_calculation_statuses(&self.params)?;
        for component in &self.amplitudes {
            component.calculate(
                &self.cache,
                &layout,
                &self.params,
                partition.events_mut(),
                table,
            )?;
        }
        Ok(())
    }

    /// The data-dependent amplitude of a tree for one event: the sum over
    /// its tops of the factor product times the daughter amplitudes at the
    /// matching sub-groupings.
    pub fn tree_data_amplitude(
        &self,
        event: &EventData,
        id: DecayTreeId,
    ) -> Result<Complex64, PwaError> {
        self.ensure_locked()?;
        let layout = self.layout()?;
        let tree = self.tree(id)?;
        let mut total = Complex64::new(0.0, 0.0);
        for &top in tree.tops() {
            total += self.data_amplitude_at(&layout, event, id, top)?;
        }
        Ok(total)
    }

    fn data_amplitude_at(
        &self,
        layout: &StorageLayout,
        event: &EventData,
        id: DecayTreeId,
        handle: GroupingHandle,
    ) -> Result<Complex64, PwaError> {
        let tree = self.tree(id)?;
        let mut amplitude = Complex64::new(1.0, 0.0);
        for &factor in tree.factors() {
            let component = self.amplitude_component(factor)?;
            amplitude *= component.value(&self.cache, layout, event, handle)?;
        }
        let slots = self.cache.grouping(handle)?.daughters().to_vec();
        for (&position, &daughter) in self.tree(id)?.daughters() {
            let sub = *slots.get(position).ok_or_else(|| {
                model_error("daughter-position", "grouping has no daughter at this position")
                    .with_context("position", position)
                    .with_context("available", slots.len())
            })?;
            amplitude *= self.data_amplitude_at(layout, event, daughter, sub)?;
        }
        Ok(amplitude)
    }

    /// The data-independent amplitude of a tree: its free amplitude times
    /// the free amplitudes of all daughter trees.
    pub fn tree_free_amplitude(&self, id: DecayTreeId) -> Result<Complex64, PwaError> {
        let tree = self.tree(id)?;
        let mut amplitude = self.params.complex(tree.free_amplitude())?;
        for &daughter in tree.daughters().values() {
            amplitude *= self.tree_free_amplitude(daughter)?;
        }
        Ok(amplitude)
    }

    /// Combined variable status of a tree's data-dependent part.
    ///
    /// Free amplitudes are excluded: they factor out of cached integrals,
    /// so changing one must not flag the tree stale.
    pub fn tree_variable_status(&self, id: DecayTreeId) -> Result<VariableStatus, PwaError> {
        let tree = self.tree(id)?;
        let mut combined = VariableStatus::Fixed;
        for &factor in tree.factors() {
            let component = self.amplitude_component(factor)?;
            combined = combine_variable_status(combined, component.variable_status(&self.params)?);
        }
        for &daughter in tree.daughters().values() {
            combined = combine_variable_status(combined, self.tree_variable_status(daughter)?);
        }
        Ok(combined)
    }

    /// The model intensity for one event: each coherent sum's admixture
    /// times the squared norm of its summed tree amplitudes.
    pub fn intensity(&self, event: &EventData) -> Result<f64, PwaError> {
        self.ensure_locked()?;
        if self.sums.is_empty() {
            return Err(model_error("no-components", "the model has no coherent sums")
                .with_hint("declare at least one decay tree before locking"));
        }
        let layout = self.layout()?;
        let mut total = 0.0;
        for sum in &self.sums {
            let admixture = self.params.real(sum.admixture())?;
            let mut coherent = Complex64::new(0.0, 0.0);
            for &tree in sum.trees() {
                let free = self.tree_free_amplitude(tree)?;
                let mut data = Complex64::new(0.0, 0.0);
                for &top in self.tree(tree)?.tops() {
                    data += self.data_amplitude_at(&layout, event, tree, top)?;
                }
                coherent += free * data;
            }
            total += admixture * coherent.norm_sqr();
        }
        Ok(total)
    }

    fn partition_log_intensity(
        &self,
        partition: &mut DataPartition<'_>,
        table: &mut StatusTable,
        pedestal: f64,
    ) -> Result<f64, PwaError> {
        self.calculate(partition, table)?;
        let mut sum = KahanSum::new();
        for event in partition.events() {
            sum.add(self.intensity(event)?.ln() - pedestal);
        }
        Ok(sum.total())
    }

    /// Sum of log intensities over every partition, each worker refreshing
    /// its own status table, minus `pedestal` per event.
    ///
    /// Partitions are processed in parallel; per-partition sums are
    /// compensated and combined in partition order, so the result does not
    /// depend on worker scheduling.
    pub fn sum_of_log_intensity(
        &self,
        partitions: &mut [DataPartition<'_>],
        tables: &mut [StatusTable],
        pedestal: f64,
    ) -> Result<f64, PwaError> {
        self.ensure_locked()?;
        if self.sums.is_empty() {
            return Err(model_error("no-components", "the model has no coherent sums")
                .with_hint("declare at least one decay tree before locking"));
        }
        if partitions.is_empty() {
            return Err(model_error(
                "no-partitions",
                "the likelihood needs at least one partition",
            ));
        }
        if partitions.len() != tables.len() {
            return Err(model_error(
                "partition-table-count",
                "one status table per partition is required",
            )
            .with_context("partitions", partitions.len())
            .with_context("tables", tables.len()));
        }
        let mut jobs: Vec<(&mut DataPartition<'_>, &mut StatusTable)> =
            partitions.iter_mut().zip(tables.iter_mut()).collect();
        let results: Result<Vec<(usize, f64)>, PwaError> = jobs
            .par_iter_mut()
            .enumerate()
            .map(|(index, (partition, table))| -> Result<(usize, f64), PwaError> {
                let value = self.partition_log_intensity(partition, table, pedestal)?;
                Ok((index, value))
            })
            .collect();
        let mut ordered = results?;
        ordered.sort_by_key(|(index, _)| *index);
        let mut total = KahanSum::new();
        for (_, value) in ordered {
            total.add(value);
        }
        Ok(total.total())
    }

    /// Structural diagnostics across the cache, the registry and the trees.
    pub fn consistency_check(&self) -> ConsistencyReport {
        let mut report = self.cache.consistency_check();
        report.merge(self.registry.consistency_check(&self.cache));
        let roots: BTreeSet<DecayTreeId> = self.root_trees().into_iter().collect();
        for (index, tree) in self.trees.iter().enumerate() {
            let id = DecayTreeId::from_raw(index as u32);
            if !roots.contains(&id) && !tree.tops().is_empty() {
                report.push(
                    "shadowed-tops",
                    format!(
                        "tree '{}' is a daughter yet carries its own tops",
                        tree.label()
                    ),
                );
            }
            for &top in tree.tops() {
                let available = match self.cache.grouping(top) {
                    Ok(grouping) => grouping.daughters().len(),
                    Err(_) => {
                        report.push(
                            "dead-grouping",
                            format!("tree '{}' references a swept grouping", tree.label()),
                        );
                        continue;
                    }
                };
                for &position in tree.daughters().keys() {
                    if position >= available {
                        report.push(
                            "daughter-position",
                            format!(
                                "tree '{}' places a daughter at position {} of a {}-daughter grouping",
                                tree.label(),
                                position,
                                available
                            ),
                        );
                    }
                }
            }
        }
        report
    }
}
