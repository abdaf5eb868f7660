//! Specialized collection types

use std::sync::Mutex;

pub use slotmap::{DefaultKey, SlotMap};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Handle type for stable references
pub type Handle = DefaultKey;

/// Typed handle for type-safe resource references
pub struct TypedHandle<T> {
    key: DefaultKey,
    _phantom: std::marker::PhantomData<T>,
}

// Manual trait impls: derives would bound them on T, but the handle is just
// a key regardless of what it points at.
impl<T> Clone for TypedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedHandle<T> {}

impl<T> PartialEq for TypedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for TypedHandle<T> {}

impl<T> std::hash::Hash for TypedHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> std::fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedHandle").field(&self.key).finish()
    }
}

impl<T> TypedHandle<T> {
    /// Create a new typed handle from a key
    pub fn new(key: DefaultKey) -> Self {
        Self {
            key,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Get the underlying key
    pub fn key(&self) -> DefaultKey {
        self.key
    }
}

/// Per-lane append buffer for parallel collection phases.
///
/// Each worker lane appends to its own arena, so parallel sections never
/// contend on a shared tail. After the section's barrier the contents are
/// drained lane by lane, which makes the merged order a function of the
/// partitioning alone rather than of thread scheduling.
///
/// The per-lane mutexes exist to keep the container safe without `unsafe`;
/// a lane only ever locks its own arena during a parallel section, so the
/// locks are uncontended in practice.
#[derive(Debug)]
pub struct LaneVec<T> {
    lanes: Vec<Mutex<Vec<T>>>,
}

impl<T> LaneVec<T> {
    /// Create an empty buffer with no lanes; call [`LaneVec::reset`] before use
    pub fn new() -> Self {
        Self { lanes: Vec::new() }
    }

    /// Clear all arenas and adjust the lane count, keeping allocations
    pub fn reset(&mut self, lane_count: usize) {
        if self.lanes.len() != lane_count {
            self.lanes.resize_with(lane_count, || Mutex::new(Vec::new()));
        }
        for lane in &mut self.lanes {
            match lane.get_mut() {
                Ok(items) => items.clear(),
                Err(poisoned) => poisoned.into_inner().clear(),
            }
        }
    }

    /// Number of lanes currently configured
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Append a value to `lane`, returning its slot within that lane.
    ///
    /// `lane` must be below [`LaneVec::lane_count`].
    pub fn push(&self, lane: usize, value: T) -> usize {
        let mut items = self.lanes[lane].lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        items.push(value);
        items.len() - 1
    }

    /// Access a previously pushed value by `(lane, slot)` address.
    ///
    /// Requires exclusive access, so it is only usable after the parallel
    /// section that produced the value has hit its barrier.
    pub fn get_mut(&mut self, lane: usize, slot: usize) -> Option<&mut T> {
        let items = match self.lanes.get_mut(lane)?.get_mut() {
            Ok(items) => items,
            Err(poisoned) => poisoned.into_inner(),
        };
        items.get_mut(slot)
    }

    /// Total number of values across all lanes
    pub fn len(&mut self) -> usize {
        self.lanes
            .iter_mut()
            .map(|lane| match lane.get_mut() {
                Ok(items) => items.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            })
            .sum()
    }

    /// True when no lane holds any value
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Move every value into `out`, lane 0 first, preserving per-lane order
    pub fn drain_ordered(&mut self, out: &mut Vec<T>) {
        for lane in &mut self.lanes {
            let items = match lane.get_mut() {
                Ok(items) => items,
                Err(poisoned) => poisoned.into_inner(),
            };
            out.append(items);
        }
    }
}

impl<T> Default for LaneVec<T> {
    fn default() -> Self {
        Self::new()
    }
}
