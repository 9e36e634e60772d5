//! Ordered stops and their attribute tags
//!
//! Every stop except the last holds at least one attribute. Operations that would leave
//! an empty stop in the middle either refuse (adding a stop) or collapse it (removing
//! the last attribute of an interior stop).

use tracing::debug;

/// One leg of a plan under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stop {
    attributes: Vec<String>,
}

impl Stop {
    /// Attribute tags in the order they were chosen
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.attributes.iter().any(|a| a == tag)
    }
}

/// The stop list plus the active-stop pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopAccumulator {
    stops: Vec<Stop>,
    active: usize,
}

impl Default for StopAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StopAccumulator {
    /// A single empty stop
    pub fn new() -> Self {
        Self {
            stops: vec![Stop::default()],
            active: 0,
        }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.stops.len() || index == self.active {
            return false;
        }
        self.active = index;
        true
    }

    pub fn stop(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    /// Whether the first stop has no attributes (blocks suggestions and RESULTS)
    pub fn first_is_empty(&self) -> bool {
        self.stops.first().is_none_or(Stop::is_empty)
    }

    /// Append an empty stop and make it active
    ///
    /// Only succeeds when the stop at `after_index` has an attribute and the current
    /// last stop is not already an empty placeholder.
    pub fn add_stop(&mut self, after_index: usize) -> bool {
        debug!(%after_index, stops = %self.stops.len(), "StopAccumulator::add_stop: called");
        let Some(stop) = self.stops.get(after_index) else {
            return false;
        };
        if stop.is_empty() || self.stops.last().is_some_and(Stop::is_empty) {
            debug!("StopAccumulator::add_stop: empty stop, ignoring");
            return false;
        }
        self.stops.push(Stop::default());
        self.active = self.stops.len() - 1;
        true
    }

    /// Delete a stop, shifting later stops down by one
    ///
    /// No-op when only one stop exists.
    pub fn remove_stop(&mut self, index: usize) -> bool {
        debug!(%index, stops = %self.stops.len(), "StopAccumulator::remove_stop: called");
        if self.stops.len() <= 1 || index >= self.stops.len() {
            return false;
        }
        self.stops.remove(index);
        if self.active >= index && self.active > 0 {
            self.active -= 1;
        }
        self.active = self.active.min(self.stops.len() - 1);
        true
    }

    /// Add a tag to a stop; adding a tag already present is a no-op
    pub fn add_attribute(&mut self, stop_index: usize, tag: &str) -> bool {
        let tag = tag.trim();
        let Some(stop) = self.stops.get_mut(stop_index) else {
            return false;
        };
        if tag.is_empty() || stop.contains(tag) {
            return false;
        }
        debug!(%stop_index, %tag, "StopAccumulator::add_attribute: added");
        stop.attributes.push(tag.to_string());
        true
    }

    /// Remove a tag; emptying a stop that is not the last removes the stop too
    pub fn remove_attribute(&mut self, stop_index: usize, tag: &str) -> bool {
        let last = self.stops.len().saturating_sub(1);
        let Some(stop) = self.stops.get_mut(stop_index) else {
            return false;
        };
        let Some(pos) = stop.attributes.iter().position(|a| a == tag.trim()) else {
            return false;
        };
        stop.attributes.remove(pos);
        debug!(%stop_index, %tag, "StopAccumulator::remove_attribute: removed");

        if stop.is_empty() && stop_index != last {
            debug!(%stop_index, "StopAccumulator::remove_attribute: cascading to remove_stop");
            self.remove_stop(stop_index);
        }
        true
    }

    /// Add the tag if absent, remove it if present
    pub fn toggle_attribute(&mut self, stop_index: usize, tag: &str) -> bool {
        match self.stops.get(stop_index) {
            Some(stop) if stop.contains(tag.trim()) => self.remove_attribute(stop_index, tag),
            Some(_) => self.add_attribute(stop_index, tag),
            None => false,
        }
    }

    /// Non-empty attribute sets in stop order, one per requested stop
    pub fn attribute_sets(&self) -> Vec<Vec<String>> {
        self.stops
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.attributes.clone())
            .collect()
    }

    /// Every stop but the last is non-empty and the active pointer is in range
    pub fn is_well_formed(&self) -> bool {
        let interior = self.stops.len().saturating_sub(1);
        !self.stops.is_empty()
            && self.active < self.stops.len()
            && self.stops[..interior].iter().all(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accumulator(stops: &[&[&str]]) -> StopAccumulator {
        let mut acc = StopAccumulator::new();
        for (i, tags) in stops.iter().enumerate() {
            if i > 0 {
                assert!(acc.add_stop(i - 1));
            }
            for tag in tags.iter() {
                assert!(acc.add_attribute(i, tag));
            }
        }
        acc
    }

    fn tags(acc: &StopAccumulator) -> Vec<Vec<&str>> {
        acc.stops()
            .iter()
            .map(|s| s.attributes().iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_new_has_single_empty_stop() {
        let acc = StopAccumulator::new();
        assert_eq!(acc.len(), 1);
        assert!(acc.first_is_empty());
        assert!(acc.attribute_sets().is_empty());
    }

    #[test]
    fn test_add_attribute_idempotent_and_ordered() {
        let mut acc = StopAccumulator::new();
        assert!(acc.add_attribute(0, "Pub"));
        assert!(acc.add_attribute(0, "Live Music"));
        assert!(!acc.add_attribute(0, "Pub"));
        assert!(!acc.add_attribute(0, "  "));
        assert!(!acc.add_attribute(3, "Pub"));
        assert_eq!(tags(&acc), vec![vec!["Pub", "Live Music"]]);
    }

    #[test]
    fn test_add_stop_requires_attribute() {
        let mut acc = StopAccumulator::new();
        let before = acc.clone();
        assert!(!acc.add_stop(0));
        assert_eq!(acc, before);

        acc.add_attribute(0, "Pub");
        assert!(acc.add_stop(0));
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.active(), 1);

        // The new last stop is empty, so another cannot be added yet
        assert!(!acc.add_stop(0));
    }

    #[test]
    fn test_remove_stop_single_is_noop() {
        let mut acc = accumulator(&[&["Pub"]]);
        assert!(!acc.remove_stop(0));
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_remove_stop_shifts_and_moves_active() {
        let mut acc = accumulator(&[&["Pub"], &["Food"], &["Club"]]);
        assert_eq!(acc.active(), 2);

        assert!(acc.remove_stop(1));
        assert_eq!(tags(&acc), vec![vec!["Pub"], vec!["Club"]]);
        assert_eq!(acc.active(), 1);
    }

    #[test]
    fn test_emptying_interior_stop_cascades() {
        let mut acc = accumulator(&[&["Pub"], &["Food"], &["Club"]]);
        assert!(acc.remove_attribute(1, "Food"));
        assert_eq!(tags(&acc), vec![vec!["Pub"], vec!["Club"]]);
    }

    #[test]
    fn test_emptying_last_stop_keeps_it() {
        let mut acc = accumulator(&[&["Pub"], &["Food"]]);
        assert!(acc.remove_attribute(1, "Food"));
        assert_eq!(acc.len(), 2);
        assert!(acc.stop(1).unwrap().is_empty());
    }

    #[test]
    fn test_emptying_stop_zero_with_successor_cascades() {
        let mut acc = accumulator(&[&["Live Music"], &["Food"]]);
        assert!(acc.remove_attribute(0, "Live Music"));
        assert_eq!(tags(&acc), vec![vec!["Food"]]);
        assert!(!acc.first_is_empty());
    }

    #[test]
    fn test_emptying_sole_stop_zero_keeps_it() {
        let mut acc = accumulator(&[&["Live Music"]]);
        assert!(acc.remove_attribute(0, "Live Music"));
        assert_eq!(acc.len(), 1);
        assert!(acc.first_is_empty());
    }

    #[test]
    fn test_toggle_attribute() {
        let mut acc = StopAccumulator::new();
        assert!(acc.toggle_attribute(0, "Pub"));
        assert!(acc.stop(0).unwrap().contains("Pub"));
        assert!(acc.toggle_attribute(0, "Pub"));
        assert!(acc.first_is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddStop(usize),
        RemoveStop(usize),
        Add(usize, usize),
        Remove(usize, usize),
        Toggle(usize, usize),
    }

    const TAGS: [&str; 4] = ["Live Music", "Pub", "Food", "Club"];

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize).prop_map(Op::AddStop),
            (0..4usize).prop_map(Op::RemoveStop),
            (0..4usize, 0..4usize).prop_map(|(s, t)| Op::Add(s, t)),
            (0..4usize, 0..4usize).prop_map(|(s, t)| Op::Remove(s, t)),
            (0..4usize, 0..4usize).prop_map(|(s, t)| Op::Toggle(s, t)),
        ]
    }

    fn apply(acc: &mut StopAccumulator, op: &Op) -> bool {
        match *op {
            Op::AddStop(i) => acc.add_stop(i),
            Op::RemoveStop(i) => acc.remove_stop(i),
            Op::Add(s, t) => acc.add_attribute(s, TAGS[t]),
            Op::Remove(s, t) => acc.remove_attribute(s, TAGS[t]),
            Op::Toggle(s, t) => acc.toggle_attribute(s, TAGS[t]),
        }
    }

    proptest! {
        #[test]
        fn prop_any_sequence_stays_well_formed(ops in prop::collection::vec(op(), 0..60)) {
            let mut acc = StopAccumulator::new();
            for op in &ops {
                apply(&mut acc, op);
                prop_assert!(acc.is_well_formed(), "after {:?}: {:?}", op, acc);
            }
        }

        #[test]
        fn prop_unchanged_when_noop(ops in prop::collection::vec(op(), 0..40), last in op()) {
            let mut acc = StopAccumulator::new();
            for op in &ops {
                apply(&mut acc, op);
            }
            let before = acc.clone();
            if !apply(&mut acc, &last) {
                prop_assert_eq!(acc, before);
            }
        }

        #[test]
        fn prop_add_stop_on_empty_stop_is_noop(ops in prop::collection::vec(op(), 0..40), index in 0..4usize) {
            let mut acc = StopAccumulator::new();
            for op in &ops {
                apply(&mut acc, op);
            }
            if acc.stop(index).is_some_and(Stop::is_empty) {
                let before = acc.clone();
                prop_assert!(!acc.add_stop(index));
                prop_assert_eq!(acc, before);
            }
        }

        #[test]
        fn prop_emptying_interior_stop_shifts_by_one(count in 2..6usize, target in 0..5usize) {
            let target = target % (count - 1);
            let names: Vec<String> = (0..count).map(|i| format!("tag-{i}")).collect();
            let mut acc = StopAccumulator::new();
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    acc.add_stop(i - 1);
                }
                acc.add_attribute(i, name);
            }

            prop_assert!(acc.remove_attribute(target, &names[target]));
            prop_assert_eq!(acc.len(), count - 1);
            for (i, stop) in acc.stops().iter().enumerate() {
                let expected = if i < target { &names[i] } else { &names[i + 1] };
                prop_assert_eq!(&stop.attributes()[0], expected);
            }
        }
    }
}
