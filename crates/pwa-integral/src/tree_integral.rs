//! Cached integral matrices over the trees of one coherent sum.
//!
//! A [`TreeIntegral`] holds one real diagonal element per tree and one
//! complex element per unordered tree pair, each a running mean over the
//! integration sample. Free amplitudes never enter the cached entries;
//! they are applied when the quadratic form is read out, so re-weighting
//! a fit never invalidates the matrix.

use pwa_core::{Complex64, ErrorInfo, PwaError};
use pwa_model::DecayTreeId;
use serde::{Deserialize, Serialize};

use crate::element::IntegralElement;

pub(crate) fn integral_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Integral(ErrorInfo::new(code, message))
}

pub(crate) trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
    fn with_hint(self, hint: impl Into<String>) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Integral(info) => {
                PwaError::Integral(info.with_context(key, value.to_string()))
            }
            other => other,
        }
    }

    fn with_hint(self, hint: impl Into<String>) -> PwaError {
        match self {
            PwaError::Integral(info) => PwaError::Integral(info.with_hint(hint)),
            other => other,
        }
    }
}

/// The integral matrix of one coherent sum.
///
/// Diagonal entries average `|A_i|²`, off-diagonal entries average
/// `conj(A_i)·A_j` for `i < j`, where `A` is the data-dependent amplitude
/// of each member tree. The lower triangle is implied by conjugation and
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeIntegral {
    trees: Vec<DecayTreeId>,
    diagonals: Vec<IntegralElement<f64>>,
    pairs: Vec<IntegralElement<Complex64>>,
}

impl TreeIntegral {
    /// Creates an empty matrix over the given member trees.
    pub fn new(trees: Vec<DecayTreeId>) -> Result<Self, PwaError> {
        if trees.is_empty() {
            return Err(integral_error(
                "no-trees",
                "an integral needs at least one member tree",
            ));
        }
        for (position, &tree) in trees.iter().enumerate() {
            if trees[..position].contains(&tree) {
                return Err(integral_error(
                    "duplicate-tree",
                    "a tree cannot appear twice in one integral",
                )
                .with_context("tree", tree.as_raw()));
            }
        }
        let n = trees.len();
        Ok(Self {
            trees,
            diagonals: vec![IntegralElement::new(); n],
            pairs: vec![IntegralElement::new(); n * (n - 1) / 2],
        })
    }

    /// Member trees in matrix order.
    pub fn trees(&self) -> &[DecayTreeId] {
        &self.trees
    }

    /// Number of member trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Matrix position of a member tree.
    pub fn position(&self, tree: DecayTreeId) -> Result<usize, PwaError> {
        self.trees
            .iter()
            .position(|&member| member == tree)
            .ok_or_else(|| {
                integral_error("unknown-tree", "tree is not a member of this integral")
                    .with_context("tree", tree.as_raw())
            })
    }

    fn check_position(&self, position: usize) -> Result<(), PwaError> {
        if position >= self.trees.len() {
            return Err(integral_error("tree-position", "tree position out of range")
                .with_context("position", position)
                .with_context("n_trees", self.trees.len()));
        }
        Ok(())
    }

    // Upper-triangle offset of the pair (i, j), i < j.
    fn pair_index(&self, i: usize, j: usize) -> usize {
        let n = self.trees.len();
        i * (2 * n - i - 1) / 2 + (j - i - 1)
    }

    /// Diagonal element of one member tree.
    pub fn diagonal(&self, position: usize) -> Result<&IntegralElement<f64>, PwaError> {
        self.check_position(position)?;
        Ok(&self.diagonals[position])
    }

    /// Off-diagonal element of the pair `(i, j)`.
    ///
    /// Only the upper triangle is stored, so `i < j` is required; the
    /// `(j, i)` entry is the conjugate of the returned value.
    pub fn off_diagonal(
        &self,
        i: usize,
        j: usize,
    ) -> Result<&IntegralElement<Complex64>, PwaError> {
        self.check_position(i)?;
        self.check_position(j)?;
        if i >= j {
            return Err(integral_error(
                "pair-order",
                "off-diagonal entries are stored for i < j only",
            )
            .with_context("i", i)
            .with_context("j", j)
            .with_hint("swap the positions and conjugate the value"));
        }
        Ok(&self.pairs[self.pair_index(i, j)])
    }

    /// Folds one event's amplitudes into every element.
    ///
    /// `amplitudes` are the data-dependent tree amplitudes in matrix order.
    pub fn accumulate(&mut self, amplitudes: &[Complex64]) -> Result<(), PwaError> {
        self.check_amplitudes(amplitudes)?;
        self.accumulate_where(amplitudes, |_| true);
        Ok(())
    }

    /// Folds one event's amplitudes into the elements touching a stale tree.
    ///
    /// A diagonal is updated when its tree is marked, an off-diagonal when
    /// either tree of the pair is. Elements of settled trees keep their
    /// means and counts untouched.
    pub fn accumulate_masked(
        &mut self,
        amplitudes: &[Complex64],
        stale: &[bool],
    ) -> Result<(), PwaError> {
        self.check_amplitudes(amplitudes)?;
        if stale.len() != self.trees.len() {
            return Err(integral_error("mask-count", "one mask entry per tree is required")
                .with_context("expected", self.trees.len())
                .with_context("actual", stale.len()));
        }
        self.accumulate_where(amplitudes, |position| stale[position]);
        Ok(())
    }

    fn check_amplitudes(&self, amplitudes: &[Complex64]) -> Result<(), PwaError> {
        if amplitudes.len() != self.trees.len() {
            return Err(integral_error(
                "amplitude-count",
                "one amplitude per member tree is required",
            )
            .with_context("expected", self.trees.len())
            .with_context("actual", amplitudes.len()));
        }
        Ok(())
    }

    fn accumulate_where(&mut self, amplitudes: &[Complex64], marked: impl Fn(usize) -> bool) {
        let n = self.trees.len();
        for i in 0..n {
            if marked(i) {
                self.diagonals[i].accumulate(amplitudes[i].norm_sqr());
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if marked(i) || marked(j) {
                    let sample = amplitudes[i].conj() * amplitudes[j];
                    let index = self.pair_index(i, j);
                    self.pairs[index].accumulate(sample);
                }
            }
        }
    }

    /// Folds another matrix over the same trees in, element by element,
    /// weighting each side by its sample counts.
    pub fn merge(&mut self, other: &TreeIntegral) -> Result<(), PwaError> {
        if self.trees != other.trees {
            return Err(integral_error(
                "tree-mismatch",
                "integrals cover different member trees",
            )
            .with_context("n_trees", self.trees.len())
            .with_context("other_n_trees", other.trees.len()));
        }
        for (mine, theirs) in self.diagonals.iter_mut().zip(&other.diagonals) {
            mine.merge(theirs);
        }
        for (mine, theirs) in self.pairs.iter_mut().zip(&other.pairs) {
            mine.merge(theirs);
        }
        Ok(())
    }

    /// Empties every element.
    pub fn reset(&mut self) {
        for diagonal in &mut self.diagonals {
            diagonal.reset();
        }
        for pair in &mut self.pairs {
            pair.reset();
        }
    }

    /// Empties the elements touching one member tree: its diagonal and
    /// every pair it takes part in.
    pub fn reset_tree(&mut self, position: usize) -> Result<(), PwaError> {
        self.check_position(position)?;
        self.diagonals[position].reset();
        let n = self.trees.len();
        for i in 0..position {
            let index = self.pair_index(i, position);
            self.pairs[index].reset();
        }
        for j in (position + 1)..n {
            let index = self.pair_index(position, j);
            self.pairs[index].reset();
        }
        Ok(())
    }

    /// Events folded into the matrix: the largest element count.
    ///
    /// After a complete integration pass every element has seen the same
    /// events and the counts agree.
    pub fn events(&self) -> u64 {
        self.diagonals
            .iter()
            .map(IntegralElement::count)
            .max()
            .unwrap_or(0)
    }

    fn check_free(&self, free: &[Complex64]) -> Result<(), PwaError> {
        if free.len() != self.trees.len() {
            return Err(integral_error(
                "amplitude-count",
                "one free amplitude per member tree is required",
            )
            .with_context("expected", self.trees.len())
            .with_context("actual", free.len()));
        }
        Ok(())
    }

    /// The coherent integral under the given free amplitudes:
    /// `Σ_i |a_i|²·I_ii + Σ_{i<j} 2·Re(conj(a_i)·a_j·I_ij)`.
    pub fn total(&self, free: &[Complex64]) -> Result<f64, PwaError> {
        self.check_free(free)?;
        let n = self.trees.len();
        let mut total = 0.0;
        for i in 0..n {
            total += free[i].norm_sqr() * self.diagonals[i].value();
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let element = self.pairs[self.pair_index(i, j)].value();
                total += 2.0 * (free[i].conj() * free[j] * element).re;
            }
        }
        Ok(total)
    }

    /// One tree's diagonal contribution: `|a_i|²·I_ii`.
    pub fn diagonal_share(&self, position: usize, free: &[Complex64]) -> Result<f64, PwaError> {
        self.check_position(position)?;
        self.check_free(free)?;
        Ok(free[position].norm_sqr() * self.diagonals[position].value())
    }

    /// Fit fractions: each tree's diagonal share over the coherent total.
    ///
    /// The fractions do not generally sum to one; the remainder is the
    /// interference contribution.
    pub fn fit_fractions(&self, free: &[Complex64]) -> Result<Vec<f64>, PwaError> {
        let total = self.total(free)?;
        if total == 0.0 {
            return Err(integral_error(
                "zero-integral",
                "fit fractions need a nonvanishing coherent total",
            )
            .with_hint("integrate events before reading fractions"));
        }
        (0..self.trees.len())
            .map(|position| Ok(self.diagonal_share(position, free)? / total))
            .collect()
    }

    /// The interference contribution: the coherent total minus every
    /// diagonal share.
    pub fn interference(&self, free: &[Complex64]) -> Result<f64, PwaError> {
        let mut remainder = self.total(free)?;
        for position in 0..self.trees.len() {
            remainder -= self.diagonal_share(position, free)?;
        }
        Ok(remainder)
    }
}
