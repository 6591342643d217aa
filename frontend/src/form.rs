use serde::Serialize;
use shared::protocol::{format_coordinate, parse_coordinate_text};
use shared::{Coordinate, WaypointRole, WaypointSource, WaypointStore};

const FIRST_POINT: &str = "Start Point";
const LAST_POINT: &str = "End Point";
const MIDDLE_POINT: &str = "Middle point";

/// Marker state handed to the map module, one entry per slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerView {
    pub lat: f64,
    pub lon: f64,
    pub role: WaypointRole,
}

/// The waypoint store together with the text of its inputs.
///
/// Input text can differ from the stored coordinate while the user is
/// typing; it is only parsed on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointForm {
    store: WaypointStore,
    inputs: Vec<String>,
}

impl Default for WaypointForm {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointForm {
    pub fn new() -> Self {
        let store = WaypointStore::new();
        let inputs = vec![String::new(); store.count()];
        Self { store, inputs }
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn placeholder(&self, index: usize) -> &'static str {
        match self.store.role(index) {
            WaypointRole::Origin => FIRST_POINT,
            WaypointRole::Via => MIDDLE_POINT,
            WaypointRole::Destination => LAST_POINT,
        }
    }

    pub fn edit(&mut self, index: usize, text: String) {
        if let Some(input) = self.inputs.get_mut(index) {
            *input = text;
        }
    }

    /// Parses the input. Valid text is normalized, anything else clears
    /// the waypoint. Returns whether the waypoint is now set.
    pub fn commit(&mut self, index: usize) -> bool {
        let Some(text) = self.inputs.get(index) else {
            return false;
        };
        match parse_coordinate_text(text) {
            Ok(coord) => {
                self.inputs[index] = format!("{} {}", coord.lat, coord.lon);
                self.store.set(index, Some(coord));
                true
            }
            Err(_) => {
                self.clear(index);
                false
            }
        }
    }

    /// Marker drag or any other map-driven move of an existing waypoint.
    pub fn drag(&mut self, index: usize, coord: Coordinate) {
        if self.store.set(index, Some(coord)) {
            self.inputs[index] = format_coordinate(coord);
        }
    }

    pub fn place(&mut self, coord: Coordinate) -> usize {
        let index = self.store.place(coord);
        self.inputs[index] = format_coordinate(coord);
        index
    }

    pub fn clear(&mut self, index: usize) {
        if self.store.clear(index) {
            self.inputs[index].clear();
        }
    }

    /// The clear button of an input: drops the input when there are more
    /// than two, otherwise empties it.
    pub fn remove(&mut self, index: usize) {
        let before = self.store.count();
        if !self.store.remove(index) {
            return;
        }
        if self.store.count() < before {
            self.inputs.remove(index);
        } else {
            self.inputs[index].clear();
        }
    }

    pub fn insert(&mut self) -> usize {
        self.inputs.push(String::new());
        self.store.insert()
    }

    pub fn swap(&mut self) {
        self.store.swap_all();
        self.inputs.reverse();
    }

    pub fn markers(&self) -> Vec<Option<MarkerView>> {
        (0..self.store.count())
            .map(|index| {
                self.store.get(index).map(|coord| MarkerView {
                    lat: coord.lat,
                    lon: coord.lon,
                    role: self.store.role(index),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_normalizes_text() {
        let mut form = WaypointForm::new();
        form.edit(0, "  38.0046970   23.8007350 ".into());
        assert!(form.commit(0));
        assert_eq!(form.inputs()[0], "38.004697 23.800735");
        assert_eq!(
            form.store().get(0),
            Some(Coordinate::new(38.004697, 23.800735))
        );
    }

    #[test]
    fn test_commit_invalid_text_clears_waypoint() {
        let mut form = WaypointForm::new();
        form.place(Coordinate::new(1.0, 1.0));
        form.edit(0, "1.0 east".into());
        assert!(!form.commit(0));
        assert_eq!(form.inputs()[0], "");
        assert_eq!(form.store().get(0), None);
    }

    #[test]
    fn test_place_writes_seven_digits() {
        let mut form = WaypointForm::new();
        assert_eq!(form.place(Coordinate::new(38.004697, 23.800735)), 0);
        assert_eq!(form.inputs()[0], "38.0046970 23.8007350");
    }

    #[test]
    fn test_placeholders_follow_roles() {
        let mut form = WaypointForm::new();
        assert_eq!(form.placeholder(0), "Start Point");
        assert_eq!(form.placeholder(1), "End Point");
        form.insert();
        assert_eq!(form.placeholder(1), "Middle point");
        assert_eq!(form.placeholder(2), "End Point");
    }

    #[test]
    fn test_remove_keeps_inputs_aligned() {
        let mut form = WaypointForm::new();
        form.insert();
        form.place(Coordinate::new(1.0, 1.0));
        form.place(Coordinate::new(2.0, 2.0));
        form.place(Coordinate::new(3.0, 3.0));

        form.remove(1);
        assert_eq!(form.inputs().len(), 2);
        assert_eq!(form.inputs()[1], "3.0000000 3.0000000");

        form.remove(0);
        assert_eq!(form.inputs().len(), 2);
        assert_eq!(form.inputs()[0], "");
        assert_eq!(form.store().get(0), None);
    }

    #[test]
    fn test_swap_reverses_inputs_and_markers() {
        let mut form = WaypointForm::new();
        form.place(Coordinate::new(1.0, 1.0));
        form.swap();
        assert_eq!(form.inputs()[0], "");
        assert_eq!(form.inputs()[1], "1.0000000 1.0000000");
        assert_eq!(
            form.markers(),
            vec![
                None,
                Some(MarkerView {
                    lat: 1.0,
                    lon: 1.0,
                    role: WaypointRole::Destination
                })
            ]
        );
    }

    #[test]
    fn test_drag_moves_only_the_dragged_marker() {
        let mut form = WaypointForm::new();
        form.place(Coordinate::new(1.0, 1.0));
        form.place(Coordinate::new(2.0, 2.0));
        let before = form.markers();

        form.drag(0, Coordinate::new(1.5, 1.25));
        form.drag(0, Coordinate::new(1.75, 1.5));

        let after = form.markers();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[1], before[1]);
        assert_eq!(
            after[0],
            Some(MarkerView {
                lat: 1.75,
                lon: 1.5,
                role: WaypointRole::Origin
            })
        );
        assert_eq!(form.inputs()[0], "1.7500000 1.5000000");
        assert_eq!(form.store().filled(), 2);
    }

    #[test]
    fn test_drag_out_of_bounds_is_ignored() {
        let mut form = WaypointForm::new();
        form.drag(5, Coordinate::new(1.0, 1.0));
        assert_eq!(form.store().filled(), 0);
    }
}
