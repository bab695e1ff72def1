//! Per-event storage, data sets and partitions.

use std::sync::Arc;

use pwa_core::{ErrorInfo, PwaError};

use crate::registry::StorageLayout;

fn storage_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Status(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError;
}

impl ContextExt for PwaError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> PwaError {
        match self {
            PwaError::Status(info) => PwaError::Status(info.with_context(key, value.to_string())),
            other => other,
        }
    }
}

/// Raw cached storage of one event: one row of reals per storage accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    rows: Vec<Vec<f64>>,
}

impl EventData {
    pub(crate) fn with_shape(widths: &[usize]) -> Self {
        Self {
            rows: widths.iter().map(|&width| vec![0.0; width]).collect(),
        }
    }

    /// Number of storage rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Reads one stored real.
    pub fn get(&self, row: usize, position: usize) -> Result<f64, PwaError> {
        self.rows
            .get(row)
            .and_then(|values| values.get(position))
            .copied()
            .ok_or_else(|| {
                storage_error("storage-out-of-bounds", "no stored value at these coordinates")
                    .with_context("row", row)
                    .with_context("position", position)
            })
    }

    /// Writes one stored real.
    pub fn set(&mut self, row: usize, position: usize, value: f64) -> Result<(), PwaError> {
        let slot = self
            .rows
            .get_mut(row)
            .and_then(|values| values.get_mut(position))
            .ok_or_else(|| {
                storage_error("storage-out-of-bounds", "no stored value at these coordinates")
                    .with_context("row", row)
                    .with_context("position", position)
            })?;
        *slot = value;
        Ok(())
    }
}

/// An owned collection of events shaped for one storage layout.
#[derive(Debug, Clone)]
pub struct DataSet {
    layout: Arc<StorageLayout>,
    events: Vec<EventData>,
}

impl DataSet {
    /// Creates an empty data set for the layout.
    pub fn new(layout: Arc<StorageLayout>) -> Self {
        Self {
            layout,
            events: Vec::new(),
        }
    }

    /// The layout the events are shaped for.
    pub fn layout(&self) -> &Arc<StorageLayout> {
        &self.layout
    }

    /// Appends a zeroed event and returns its index.
    pub fn add_empty(&mut self) -> usize {
        self.events.push(self.layout.empty_event());
        self.events.len() - 1
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when no events are stored.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops all stored events, keeping the layout.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// All events in insertion order.
    pub fn events(&self) -> &[EventData] {
        &self.events
    }

    /// All events in insertion order, mutably.
    pub fn events_mut(&mut self) -> &mut [EventData] {
        &mut self.events
    }

    /// One event by index.
    pub fn event(&self, index: usize) -> Result<&EventData, PwaError> {
        self.events.get(index).ok_or_else(|| {
            storage_error("unknown-event", "event index out of range")
                .with_context("event", index)
        })
    }

    /// One event by index, mutably.
    pub fn event_mut(&mut self, index: usize) -> Result<&mut EventData, PwaError> {
        let len = self.events.len();
        self.events.get_mut(index).ok_or_else(|| {
            storage_error("unknown-event", "event index out of range")
                .with_context("event", index)
                .with_context("len", len)
        })
    }
}

/// A disjoint slice of a data set's events, exclusively owned by one worker.
#[derive(Debug)]
pub struct DataPartition<'a> {
    index: usize,
    events: Vec<&'a mut EventData>,
}

impl<'a> DataPartition<'a> {
    /// Position of the partition within its partitioning.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of events in the partition.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when the partition holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The partition's events as a mutable slice of exclusive borrows.
    pub fn events_mut(&mut self) -> &mut [&'a mut EventData] {
        &mut self.events
    }

    /// Iterates the partition's events immutably.
    pub fn events(&self) -> impl Iterator<Item = &EventData> {
        self.events.iter().map(|event| &**event)
    }
}

/// Splits a data set into up to `partitions` contiguous blocks.
///
/// The blocks cover every event exactly once; the last block may be shorter.
pub fn partition_block(
    data: &mut DataSet,
    partitions: usize,
) -> Result<Vec<DataPartition<'_>>, PwaError> {
    let count = partition_count(data, partitions)?;
    let chunk = (data.len() + count - 1) / count;
    Ok(data
        .events_mut()
        .chunks_mut(chunk)
        .enumerate()
        .map(|(index, block)| DataPartition {
            index,
            events: block.iter_mut().collect(),
        })
        .collect())
}

/// Splits a data set into up to `partitions` interleaved slices, assigning
/// event `i` to partition `i % partitions`.
pub fn partition_strided(
    data: &mut DataSet,
    partitions: usize,
) -> Result<Vec<DataPartition<'_>>, PwaError> {
    let count = partition_count(data, partitions)?;
    let mut buckets: Vec<Vec<&mut EventData>> = (0..count).map(|_| Vec::new()).collect();
    for (position, event) in data.events_mut().iter_mut().enumerate() {
        buckets[position % count].push(event);
    }
    Ok(buckets
        .into_iter()
        .enumerate()
        .map(|(index, events)| DataPartition { index, events })
        .collect())
}

fn partition_count(data: &DataSet, partitions: usize) -> Result<usize, PwaError> {
    if partitions == 0 {
        return Err(storage_error(
            "zero-partitions",
            "at least one partition is required",
        ));
    }
    if data.is_empty() {
        return Err(storage_error(
            "empty-data",
            "cannot partition an empty data set",
        ));
    }
    Ok(partitions.min(data.len()))
}
