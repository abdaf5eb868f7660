//! The batch collection pipeline
//!
//! Everything between "here is a scene and a camera" and "here are sorted
//! draw batches with resolved pipeline states". The modules mirror the
//! frame stages:
//!
//! - [`transient`]: per-drawable traits and depth intervals for one frame
//! - [`batch`]: intermediate and final batch records
//! - [`passes`]: scene pass configuration and per-pass classification
//! - [`lights`]: per-light geometry queries and the cross-frame light cache
//! - [`light_accumulator`]: the per-drawable pixel light budget
//! - [`pipeline_cache`]: memoized pipeline states and the backend trait
//! - [`sort`]: submission ordering
//! - [`collector`]: the orchestrator tying the stages together

pub mod batch;
pub mod collector;
pub mod light_accumulator;
pub mod lights;
pub mod passes;
pub mod pipeline_cache;
pub mod sort;
pub mod transient;

pub use batch::{IntermediateSceneBatch, SceneBatch};
pub use collector::{CollectError, FrameStats, SceneBatchCollector};
pub use light_accumulator::{AccumulatedLight, LightAccumulatorSet};
pub use lights::{LightData, LightDataCache, LIGHT_CACHE_PRUNE_AGE};
pub use passes::{PassConfigError, PassData, ScenePassDescription, ScenePassType};
pub use pipeline_cache::{
    PipelineBackend, PipelineCacheStats, PipelineState, PipelineStateCache, PipelineStateDesc,
    PipelineStateError, PipelineStateKey,
};
pub use sort::{sort_batches, BatchSortMode};
pub use transient::{DrawableTraits, TransientDrawableIndex, ZRange, ZRangeEvaluator};
