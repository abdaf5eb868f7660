//! Per-drawable pixel light accumulation
//!
//! Every visible light walks its lit geometries and offers itself to each
//! drawable's accumulator. The accumulator keeps the best `budget` lights
//! ordered by importance class, then penalized distance, then light index,
//! so the surviving set and its order are independent of which lane offered
//! which light first.
//!
//! Multiple lanes accumulate into the same drawable when its geometry is lit
//! by lights processed on different lanes, so each drawable's entry list
//! sits behind its own mutex. Lock scope is one bounded insert.

use std::sync::Mutex;

use crate::scene::light::LightImportance;

/// One light's claim on a drawable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatedLight {
    /// Importance class, compared first
    pub importance: LightImportance,
    /// Distance divided by the light's intensity divisor
    pub scaled_distance: f32,
    /// Index into the frame's visible light list
    pub light_index: u32,
}

impl AccumulatedLight {
    /// Total order used for the per-drawable ranking: higher importance
    /// first, then smaller penalized distance, then smaller light index as
    /// the deterministic tie break.
    pub fn cmp_rank(&self, other: &Self) -> std::cmp::Ordering {
        other
            .importance
            .cmp(&self.importance)
            .then_with(|| self.scaled_distance.total_cmp(&other.scaled_distance))
            .then_with(|| self.light_index.cmp(&other.light_index))
    }
}

/// Bounded, sorted light list for one drawable
#[derive(Debug, Default)]
struct DrawableLightAccumulator {
    entries: Vec<AccumulatedLight>,
}

impl DrawableLightAccumulator {
    fn reset(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, entry: AccumulatedLight, budget: usize) {
        let position = self
            .entries
            .iter()
            .position(|existing| entry.cmp_rank(existing).is_lt())
            .unwrap_or(self.entries.len());
        if position >= budget {
            return;
        }
        self.entries.insert(position, entry);
        self.entries.truncate(budget);
    }
}

/// Frame-scoped accumulators for every drawable, indexed by drawable index
pub struct LightAccumulatorSet {
    accumulators: Vec<Mutex<DrawableLightAccumulator>>,
    budget: usize,
}

impl LightAccumulatorSet {
    /// Create empty storage; call [`LightAccumulatorSet::reset`] before use
    pub fn new() -> Self {
        Self {
            accumulators: Vec::new(),
            budget: 1,
        }
    }

    /// Size for `count` drawables and set the per-drawable budget.
    ///
    /// Existing entry lists are not cleared here; the visibility phase calls
    /// [`LightAccumulatorSet::reset_drawable`] for each drawable it marks
    /// visible, which keeps the reset cost proportional to the visible set
    /// rather than the scene.
    pub fn reset(&mut self, count: usize, budget: usize) {
        if self.accumulators.len() < count {
            self.accumulators.resize_with(count, Mutex::default);
        }
        self.budget = budget.max(1);
    }

    /// Clear one drawable's list for the new frame
    pub fn reset_drawable(&self, index: u32) {
        self.lock(index).reset();
    }

    /// Offer a light to a drawable's budget
    pub fn insert(&self, index: u32, entry: AccumulatedLight) {
        let budget = self.budget;
        self.lock(index).insert(entry, budget);
    }

    /// Read a drawable's surviving lights, best first
    pub fn visit<R>(&self, index: u32, reader: impl FnOnce(&[AccumulatedLight]) -> R) -> R {
        reader(&self.lock(index).entries)
    }

    fn lock(&self, index: u32) -> std::sync::MutexGuard<'_, DrawableLightAccumulator> {
        self.accumulators[index as usize]
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for LightAccumulatorSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(importance: LightImportance, scaled_distance: f32, light_index: u32) -> AccumulatedLight {
        AccumulatedLight {
            importance,
            scaled_distance,
            light_index,
        }
    }

    #[test]
    fn test_important_light_survives_budget_of_one() {
        let mut set = LightAccumulatorSet::new();
        set.reset(1, 1);
        set.reset_drawable(0);

        // The distant important light must beat the near auto light
        set.insert(0, entry(LightImportance::Auto, 0.5, 0));
        set.insert(0, entry(LightImportance::Important, 9.0, 1));

        set.visit(0, |lights| {
            assert_eq!(lights.len(), 1);
            assert_eq!(lights[0].light_index, 1);
        });
    }

    #[test]
    fn test_budget_keeps_closest_and_orders_output() {
        let mut set = LightAccumulatorSet::new();
        set.reset(1, 2);
        set.reset_drawable(0);

        set.insert(0, entry(LightImportance::Auto, 3.0, 0));
        set.insert(0, entry(LightImportance::Auto, 1.0, 1));
        set.insert(0, entry(LightImportance::Auto, 2.0, 2));
        set.insert(0, entry(LightImportance::NotImportant, 0.1, 3));

        set.visit(0, |lights| {
            let indices: Vec<u32> = lights.iter().map(|l| l.light_index).collect();
            assert_eq!(indices, vec![1, 2]);
        });
    }

    #[test]
    fn test_equal_lights_tie_break_on_index() {
        let mut set = LightAccumulatorSet::new();
        set.reset(1, 1);
        set.reset_drawable(0);

        set.insert(0, entry(LightImportance::Auto, 2.0, 7));
        set.insert(0, entry(LightImportance::Auto, 2.0, 3));

        set.visit(0, |lights| {
            assert_eq!(lights[0].light_index, 3);
        });
    }

    #[test]
    fn test_result_independent_of_insertion_interleaving() {
        let entries = [
            entry(LightImportance::Auto, 5.0, 0),
            entry(LightImportance::Important, 8.0, 1),
            entry(LightImportance::Auto, 1.0, 2),
            entry(LightImportance::NotImportant, 0.5, 3),
            entry(LightImportance::Auto, 1.0, 4),
        ];

        let collect = |order: &[usize]| {
            let mut set = LightAccumulatorSet::new();
            set.reset(1, 3);
            set.reset_drawable(0);
            for &i in order {
                set.insert(0, entries[i]);
            }
            set.visit(0, |lights| lights.to_vec())
        };

        let forward = collect(&[0, 1, 2, 3, 4]);
        let reverse = collect(&[4, 3, 2, 1, 0]);
        assert_eq!(forward, reverse);
        assert_eq!(forward[0].light_index, 1);
        assert_eq!(forward[1].light_index, 2);
        assert_eq!(forward[2].light_index, 4);
    }

    #[test]
    fn test_concurrent_inserts_reach_same_ranking() {
        let mut set = LightAccumulatorSet::new();
        set.reset(4, 2);
        for i in 0..4 {
            set.reset_drawable(i);
        }

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for d in 0..4 {
                    set.insert(d, entry(LightImportance::Auto, 2.0, 0));
                    set.insert(d, entry(LightImportance::Auto, 4.0, 1));
                }
            });
            scope.spawn(|| {
                for d in 0..4 {
                    set.insert(d, entry(LightImportance::Auto, 1.0, 2));
                    set.insert(d, entry(LightImportance::Auto, 3.0, 3));
                }
            });
        });

        for d in 0..4 {
            set.visit(d, |lights| {
                let indices: Vec<u32> = lights.iter().map(|l| l.light_index).collect();
                assert_eq!(indices, vec![2, 0], "drawable {d}");
            });
        }
    }
}
