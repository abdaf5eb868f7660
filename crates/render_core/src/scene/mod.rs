//! Scene-side data model consumed by the collector
//!
//! Drawables, lights, cameras and the material system. Everything here is
//! owned by the application; the collector borrows it for the duration of a
//! frame.

pub mod camera;
pub mod drawable;
pub mod light;
pub mod material;
pub mod model;
pub mod technique;

pub use camera::{Camera, ViewOverrideFlags};
pub use drawable::{Drawable, DrawableFlags, FrameInfo, GeometryId, SourceBatch};
pub use light::{Light, LightId, LightImportance, LightType};
pub use material::{Material, MaterialId, MaterialRegistry};
pub use model::Model;
pub use technique::{Pass, PassIndex, PassRef, Technique, TechniqueEntry, TechniqueHandle};
