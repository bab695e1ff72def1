//! Integral state over a whole model and its readout reports.
//!
//! A [`ModelIntegral`] carries one [`TreeIntegral`] per coherent sum of a
//! locked model. Reading it out applies the current free amplitudes and
//! admixtures, so a fit can move those parameters freely between
//! integration passes without touching the cached matrices.

use pwa_core::{Complex64, ParameterId, PwaError};
use pwa_model::{DecayTreeId, Model};
use serde::{Deserialize, Serialize};

use crate::tree_integral::{integral_error, ContextExt, TreeIntegral};

/// The integral matrix of one coherent sum, with the sum's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentIntegral {
    two_m: i32,
    admixture: ParameterId,
    integral: TreeIntegral,
}

impl ComponentIntegral {
    /// Twice the spin projection of the underlying coherent sum.
    pub fn two_m(&self) -> i32 {
        self.two_m
    }

    /// The sum's admixture parameter.
    pub fn admixture(&self) -> ParameterId {
        self.admixture
    }

    /// The cached integral matrix.
    pub fn integral(&self) -> &TreeIntegral {
        &self.integral
    }

    pub(crate) fn integral_mut(&mut self) -> &mut TreeIntegral {
        &mut self.integral
    }
}

/// Cached integrals for every coherent sum of one locked model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelIntegral {
    components: Vec<ComponentIntegral>,
}

impl ModelIntegral {
    /// Creates empty integral state shaped for a locked model.
    pub fn new(model: &Model) -> Result<Self, PwaError> {
        if !model.is_locked() {
            return Err(integral_error("model-open", "lock the model before integrating")
                .with_hint("call lock once assembly is complete"));
        }
        if model.sums().is_empty() {
            return Err(integral_error(
                "no-components",
                "the model has no coherent sums to integrate",
            ));
        }
        let components = model
            .sums()
            .iter()
            .map(|sum| {
                Ok(ComponentIntegral {
                    two_m: sum.two_m(),
                    admixture: sum.admixture(),
                    integral: TreeIntegral::new(sum.trees().to_vec())?,
                })
            })
            .collect::<Result<Vec<_>, PwaError>>()?;
        Ok(Self { components })
    }

    /// Per-sum integrals in coherent-sum order.
    pub fn components(&self) -> &[ComponentIntegral] {
        &self.components
    }

    /// One per-sum integral.
    pub fn component(&self, index: usize) -> Result<&ComponentIntegral, PwaError> {
        self.components.get(index).ok_or_else(|| {
            integral_error("unknown-component", "no coherent sum at this index")
                .with_context("component", index)
                .with_context("n_components", self.components.len())
        })
    }

    pub(crate) fn components_mut(&mut self) -> &mut [ComponentIntegral] {
        &mut self.components
    }

    /// A same-shaped copy with every element empty.
    pub fn zeroed(&self) -> Self {
        let mut copy = self.clone();
        for component in &mut copy.components {
            component.integral.reset();
        }
        copy
    }

    /// Events folded in: the largest component event count.
    pub fn events(&self) -> u64 {
        self.components
            .iter()
            .map(|component| component.integral.events())
            .max()
            .unwrap_or(0)
    }

    /// Checks that the integral was shaped for this model's coherent sums.
    pub fn check_model(&self, model: &Model) -> Result<(), PwaError> {
        let mismatch = || {
            integral_error(
                "model-mismatch",
                "integral state was built for a different model",
            )
            .with_hint("build the integral from the locked model it integrates")
        };
        if !model.is_locked() || model.sums().len() != self.components.len() {
            return Err(mismatch());
        }
        for (component, sum) in self.components.iter().zip(model.sums()) {
            if component.two_m != sum.two_m()
                || component.admixture != sum.admixture()
                || component.integral.trees() != sum.trees()
            {
                return Err(mismatch());
            }
        }
        Ok(())
    }

    /// Folds another integral over the same model in, element by element.
    pub fn merge(&mut self, other: &ModelIntegral) -> Result<(), PwaError> {
        if self.components.len() != other.components.len() {
            return Err(integral_error(
                "component-mismatch",
                "integrals cover different coherent sums",
            )
            .with_context("components", self.components.len())
            .with_context("other_components", other.components.len()));
        }
        for (mine, theirs) in self.components.iter_mut().zip(&other.components) {
            mine.integral.merge(&theirs.integral)?;
        }
        Ok(())
    }

    fn free_amplitudes(model: &Model, trees: &[DecayTreeId]) -> Result<Vec<Complex64>, PwaError> {
        trees
            .iter()
            .map(|&tree| model.tree_free_amplitude(tree))
            .collect()
    }

    /// The model integral under the current parameters: each sum's coherent
    /// total weighted by its admixture.
    pub fn total(&self, model: &Model) -> Result<f64, PwaError> {
        self.check_model(model)?;
        let mut total = 0.0;
        for component in &self.components {
            let admixture = model.params().real(component.admixture)?;
            let free = Self::free_amplitudes(model, component.integral.trees())?;
            total += admixture * component.integral.total(&free)?;
        }
        Ok(total)
    }

    /// Reads the integral out under the current parameters.
    ///
    /// Fit fractions are normalized across the whole model: each tree's
    /// admixture-weighted diagonal share over the model total.
    pub fn report(&self, model: &Model) -> Result<IntegralReport, PwaError> {
        let total = self.total(model)?;
        if total == 0.0 {
            return Err(integral_error(
                "zero-integral",
                "fit fractions need a nonvanishing model total",
            )
            .with_hint("integrate events before reading the report"));
        }
        let mut components = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let admixture = model.params().real(component.admixture)?;
            let free = Self::free_amplitudes(model, component.integral.trees())?;
            let coherent = component.integral.total(&free)?;
            let interference = component.integral.interference(&free)?;
            let mut trees = Vec::with_capacity(component.integral.n_trees());
            for (position, &tree) in component.integral.trees().iter().enumerate() {
                let diagonal = component.integral.diagonal(position)?;
                let share = component.integral.diagonal_share(position, &free)?;
                trees.push(TreeReport {
                    label: model.tree(tree)?.label().to_string(),
                    diagonal: diagonal.value(),
                    events: diagonal.count(),
                    share,
                    fit_fraction: admixture * share / total,
                });
            }
            components.push(ComponentReport {
                two_m: component.two_m,
                admixture,
                coherent,
                interference,
                trees,
            });
        }
        Ok(IntegralReport {
            total,
            events: self.events(),
            components,
        })
    }
}

/// One tree's slice of an [`IntegralReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeReport {
    /// Label of the decay tree.
    pub label: String,
    /// Cached diagonal mean `I_ii`, free amplitudes not applied.
    pub diagonal: f64,
    /// Events folded into the diagonal.
    pub events: u64,
    /// Diagonal share within the sum: `|a_i|²·I_ii`.
    pub share: f64,
    /// Admixture-weighted share over the model total.
    pub fit_fraction: f64,
}

/// One coherent sum's slice of an [`IntegralReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    /// Twice the spin projection of the sum.
    pub two_m: i32,
    /// Admixture value at readout time.
    pub admixture: f64,
    /// The sum's coherent total, admixture not applied.
    pub coherent: f64,
    /// Coherent total minus every diagonal share.
    pub interference: f64,
    /// Per-tree readouts in matrix order.
    pub trees: Vec<TreeReport>,
}

/// Snapshot of a model integral under the parameters at readout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralReport {
    /// Admixture-weighted total over every coherent sum.
    pub total: f64,
    /// Events folded into the integral.
    pub events: u64,
    /// Per-sum readouts in coherent-sum order.
    pub components: Vec<ComponentReport>,
}
