//! Equivalence relations over groupings.
//!
//! Each accessor folds registered groupings into shared symmetrization
//! indices under one of these relations. The relations form a closed set, so
//! they are expressed as a plain enum rather than an open trait hierarchy.

use serde::{Deserialize, Serialize};

use pwa_core::PwaError;

use crate::cache::GroupingCache;
use crate::grouping::GroupingHandle;

/// How two groupings are compared when folding symmetrization indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Equivalence {
    /// Identical handles only.
    ByHandle,
    /// Same particle indices in the same order.
    ByOrderedContent,
    /// Same particle indices in any order.
    ByOrderlessContent,
    /// Ordered content matches here and recursively down the daughters.
    DownTree,
    /// Ordered content matches here and up the parent chain.
    UpTree,
    /// Ordered content matches down the daughters and up the parent chain.
    UpAndDownTree,
    /// Orderless content matches here and across the daughter sets, without
    /// descending past the daughters.
    DownByOrderlessContent,
}

impl Equivalence {
    /// Evaluates the relation for two groupings.
    pub fn eval(
        self,
        cache: &GroupingCache,
        a: GroupingHandle,
        b: GroupingHandle,
    ) -> Result<bool, PwaError> {
        if a == b {
            return Ok(true);
        }
        match self {
            Equivalence::ByHandle => Ok(false),
            Equivalence::ByOrderedContent => ordered_content_eq(cache, a, b),
            Equivalence::ByOrderlessContent => orderless_content_eq(cache, a, b),
            Equivalence::DownTree => down_tree_eq(cache, a, b),
            Equivalence::UpTree => {
                Ok(ordered_content_eq(cache, a, b)? && up_chain_eq(cache, a, b)?)
            }
            Equivalence::UpAndDownTree => {
                Ok(down_tree_eq(cache, a, b)? && up_chain_eq(cache, a, b)?)
            }
            Equivalence::DownByOrderlessContent => down_orderless_eq(cache, a, b),
        }
    }
}

fn ordered_content_eq(
    cache: &GroupingCache,
    a: GroupingHandle,
    b: GroupingHandle,
) -> Result<bool, PwaError> {
    Ok(cache.grouping(a)?.indices() == cache.grouping(b)?.indices())
}

fn orderless_content_eq(
    cache: &GroupingCache,
    a: GroupingHandle,
    b: GroupingHandle,
) -> Result<bool, PwaError> {
    Ok(cache.grouping(a)?.sorted_indices() == cache.grouping(b)?.sorted_indices())
}

pub(crate) fn down_tree_eq(
    cache: &GroupingCache,
    a: GroupingHandle,
    b: GroupingHandle,
) -> Result<bool, PwaError> {
    if !ordered_content_eq(cache, a, b)? {
        return Ok(false);
    }
    let da = cache.grouping(a)?.daughters().to_vec();
    let db = cache.grouping(b)?.daughters().to_vec();
    if da.len() != db.len() {
        return Ok(false);
    }
    for (x, y) in da.into_iter().zip(db) {
        if !down_tree_eq(cache, x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn up_chain_eq(
    cache: &GroupingCache,
    a: GroupingHandle,
    b: GroupingHandle,
) -> Result<bool, PwaError> {
    match (cache.grouping(a)?.parent(), cache.grouping(b)?.parent()) {
        (None, None) => Ok(true),
        (Some(pa), Some(pb)) => {
            Ok(ordered_content_eq(cache, pa, pb)? && up_chain_eq(cache, pa, pb)?)
        }
        _ => Ok(false),
    }
}

fn down_orderless_eq(
    cache: &GroupingCache,
    a: GroupingHandle,
    b: GroupingHandle,
) -> Result<bool, PwaError> {
    if !orderless_content_eq(cache, a, b)? {
        return Ok(false);
    }
    // Compare daughters as multisets of orderless content, one level deep.
    let mut da = daughter_contents(cache, a)?;
    let mut db = daughter_contents(cache, b)?;
    da.sort();
    db.sort();
    Ok(da == db)
}

fn daughter_contents(
    cache: &GroupingCache,
    handle: GroupingHandle,
) -> Result<Vec<Vec<u8>>, PwaError> {
    let daughters = cache.grouping(handle)?.daughters().to_vec();
    let mut contents = Vec::with_capacity(daughters.len());
    for daughter in daughters {
        let mut indices: Vec<u8> = cache
            .grouping(daughter)?
            .indices()
            .iter()
            .map(|idx| idx.as_raw())
            .collect();
        indices.sort_unstable();
        contents.push(indices);
    }
    Ok(contents)
}
