//! Decay trees and the coherent sums they are grouped into.
//!
//! A tree pairs one free complex amplitude with the factors and daughter
//! trees that make up one decay chain. Trees say nothing about storage;
//! their factors are amplitude components resolved through the owning
//! model, and their tops are groupings the whole chain is evaluated on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pwa_combin::GroupingHandle;
use pwa_core::ParameterId;

use crate::component::AmplitudeId;

/// Identifier of a decay tree within its model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DecayTreeId(u32);

impl DecayTreeId {
    /// Wraps a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// One decay chain: a free amplitude, its factors and its daughter trees.
#[derive(Debug, Clone)]
pub struct DecayTree {
    label: String,
    free_amplitude: ParameterId,
    two_m: i32,
    tops: Vec<GroupingHandle>,
    factors: Vec<AmplitudeId>,
    daughters: BTreeMap<usize, DecayTreeId>,
}

impl DecayTree {
    pub(crate) fn new(label: String, free_amplitude: ParameterId, two_m: i32) -> Self {
        Self {
            label,
            free_amplitude,
            two_m,
            tops: Vec::new(),
            factors: Vec::new(),
            daughters: BTreeMap::new(),
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The tree's free complex amplitude parameter.
    pub fn free_amplitude(&self) -> ParameterId {
        self.free_amplitude
    }

    /// Twice the spin projection of the decaying state.
    pub fn two_m(&self) -> i32 {
        self.two_m
    }

    /// Groupings this tree is evaluated on.
    pub fn tops(&self) -> &[GroupingHandle] {
        &self.tops
    }

    /// Amplitude components multiplied at this node.
    pub fn factors(&self) -> &[AmplitudeId] {
        &self.factors
    }

    /// Daughter trees keyed by daughter position within the top grouping.
    pub fn daughters(&self) -> &BTreeMap<usize, DecayTreeId> {
        &self.daughters
    }

    pub(crate) fn push_top(&mut self, top: GroupingHandle) {
        self.tops.push(top);
    }

    pub(crate) fn push_factor(&mut self, factor: AmplitudeId) {
        self.factors.push(factor);
    }

    pub(crate) fn insert_daughter(&mut self, position: usize, daughter: DecayTreeId) {
        self.daughters.insert(position, daughter);
    }
}

/// Trees sharing one spin projection, summed coherently under one admixture.
#[derive(Debug, Clone)]
pub struct CoherentSum {
    two_m: i32,
    admixture: ParameterId,
    trees: Vec<DecayTreeId>,
}

impl CoherentSum {
    pub(crate) fn new(two_m: i32, admixture: ParameterId, trees: Vec<DecayTreeId>) -> Self {
        Self {
            two_m,
            admixture,
            trees,
        }
    }

    /// Twice the spin projection shared by the member trees.
    pub fn two_m(&self) -> i32 {
        self.two_m
    }

    /// Non-negative admixture weighting this sum in the total intensity.
    pub fn admixture(&self) -> ParameterId {
        self.admixture
    }

    /// Root trees summed coherently.
    pub fn trees(&self) -> &[DecayTreeId] {
        &self.trees
    }
}
