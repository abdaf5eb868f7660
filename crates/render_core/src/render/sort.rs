//! Batch ordering for submission
//!
//! Two orders cover the forward passes: opaque passes group by pipeline
//! state to minimize state changes, transparent passes draw back to front
//! for correct blending. Both orders break remaining ties on batch identity
//! so the output is a pure function of the batch set.

use serde::{Deserialize, Serialize};

use crate::render::batch::SceneBatch;

/// How a scene pass orders its batches before submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BatchSortMode {
    /// Group by pipeline state, then by drawable; for opaque passes
    #[default]
    StateThenDrawable,
    /// Farthest first; for transparent passes
    BackToFront,
}

type StateKey = (u32, u32, u32, u32);

/// Identity-based key: pipeline state id first, then the batch's stable
/// indices. Batches without a resolved state sort last.
fn state_key(batch: &SceneBatch) -> StateKey {
    (
        batch
            .pipeline_state
            .as_ref()
            .map_or(u32::MAX, |state| state.id()),
        batch.drawable_index,
        batch.source_batch_index,
        batch.light_index.map_or(u32::MAX, |index| index),
    )
}

/// Sort `batches` in place according to `mode`
pub fn sort_batches(batches: &mut [SceneBatch], mode: BatchSortMode) {
    match mode {
        BatchSortMode::StateThenDrawable => {
            batches.sort_unstable_by_key(state_key);
        }
        BatchSortMode::BackToFront => {
            batches.sort_unstable_by(|a, b| {
                b.distance
                    .total_cmp(&a.distance)
                    .then_with(|| state_key(a).cmp(&state_key(b)))
            });
        }
    }
}
