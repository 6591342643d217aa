use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Minimum number of slots: an origin and a destination.
pub const MIN_SLOTS: usize = 2;

/// Read access to the ordered waypoint slots.
///
/// This is all the query builder needs, so tests and alternative UIs can
/// feed it without a full [`WaypointStore`].
pub trait WaypointSource {
    fn count(&self) -> usize;
    fn get(&self, index: usize) -> Option<Coordinate>;
}

impl WaypointSource for [Option<Coordinate>] {
    fn count(&self) -> usize {
        self.len()
    }

    fn get(&self, index: usize) -> Option<Coordinate> {
        <[Option<Coordinate>]>::get(self, index).copied().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Origin,
    Via,
    Destination,
}

/// Ordered list of optional waypoints backing the inputs and markers.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointStore {
    slots: Vec<Option<Coordinate>>,
}

impl Default for WaypointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointStore {
    pub fn new() -> Self {
        Self {
            slots: vec![None; MIN_SLOTS],
        }
    }

    pub fn slots(&self) -> &[Option<Coordinate>] {
        &self.slots
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Roles follow the index, so they never need fixing after a reorder.
    pub fn role(&self, index: usize) -> WaypointRole {
        if index == 0 {
            WaypointRole::Origin
        } else if index + 1 == self.slots.len() {
            WaypointRole::Destination
        } else {
            WaypointRole::Via
        }
    }

    /// Returns `false` when `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Option<Coordinate>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, index: usize) -> bool {
        self.set(index, None)
    }

    /// Appends an empty destination slot and returns its index. The previous
    /// destination becomes a via point.
    pub fn insert(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Deletes the slot, or only clears it when the store is already at its
    /// minimum size.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.slots.len() {
            return false;
        }
        if self.slots.len() > MIN_SLOTS {
            self.slots.remove(index);
        } else {
            self.slots[index] = None;
        }
        true
    }

    /// Reverses the route: the destination becomes the origin.
    pub fn swap_all(&mut self) {
        self.slots.reverse();
    }

    /// Map click placement: fills the first empty slot, or moves the
    /// destination when every slot is taken.
    pub fn place(&mut self, coord: Coordinate) -> usize {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len() - 1);
        self.slots[index] = Some(coord);
        index
    }
}

impl WaypointSource for WaypointStore {
    fn count(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> Option<Coordinate> {
        self.slots.get(index).copied().flatten()
    }
}
