//! Capacity-one cache for helicity-frame transforms.
//!
//! Angle-producing kinematic components repeat the same boost-and-rotate
//! work for every grouping sharing a parent frame. The cache keeps those
//! transforms for exactly one event; a different token drops everything
//! from the previous event before serving the new one.

use std::collections::BTreeMap;
use std::sync::Mutex;

use pwa_combin::GroupingHandle;
use pwa_core::{ErrorInfo, FourVector, PwaError};

fn frame_error(code: impl Into<String>, message: impl Into<String>) -> PwaError {
    PwaError::Model(ErrorInfo::new(code, message))
}

#[derive(Default)]
struct FrameSlot {
    token: u64,
    frames: BTreeMap<GroupingHandle, FourVector>,
}

/// Per-event scratch cache of frame-aligned momenta.
///
/// Interior mutability lets a component populate the cache from `&self`
/// during the seeding pass. Holding frames for a single event keeps the
/// memory bound independent of data-set size.
#[derive(Default)]
pub struct FrameCache {
    slot: Mutex<FrameSlot>,
}

impl FrameCache {
    /// An empty cache with token zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached frame for a grouping, computing and storing it on
    /// a miss. A token different from the cached one clears the cache first.
    pub fn frame_for(
        &self,
        token: u64,
        handle: GroupingHandle,
        compute: impl FnOnce() -> Result<FourVector, PwaError>,
    ) -> Result<FourVector, PwaError> {
        let mut slot = self.lock()?;
        if slot.token != token {
            slot.frames.clear();
            slot.token = token;
        }
        if let Some(&frame) = slot.frames.get(&handle) {
            return Ok(frame);
        }
        let frame = compute()?;
        slot.frames.insert(handle, frame);
        Ok(frame)
    }

    /// Drops every cached frame, keeping the current token.
    pub fn invalidate(&self) -> Result<(), PwaError> {
        self.lock()?.frames.clear();
        Ok(())
    }

    /// Number of frames held for the current token.
    pub fn len(&self) -> Result<usize, PwaError> {
        Ok(self.lock()?.frames.len())
    }

    /// Whether the cache currently holds no frames.
    pub fn is_empty(&self) -> Result<bool, PwaError> {
        Ok(self.lock()?.frames.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FrameSlot>, PwaError> {
        self.slot.lock().map_err(|_| {
            PwaError::Model(
                ErrorInfo::new("frame-cache-poisoned", "a seeding pass panicked mid-update")
                    .with_hint("rebuild the component holding this cache"),
            )
        })
    }
}
