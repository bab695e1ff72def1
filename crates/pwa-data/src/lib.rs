#![deny(missing_docs)]

//! Per-event cached storage for the PWA engine: the accessor registry, the
//! storage layout frozen at lock, typed slot views, per-partition status
//! tables and event partitioning.

mod event;
mod registry;
mod slot;
mod status_table;

pub use event::{partition_block, partition_strided, DataPartition, DataSet, EventData};
pub use registry::{
    AccessorId, AccessorKind, AccessorRegistry, LayoutAccessor, LayoutSlot, ResolvedDependency,
    SlotDependency, SlotId, SlotKind, StorageLayout,
};
pub use slot::{ComplexSlot, FourSlot, RealSlot};
pub use status_table::StatusTable;
