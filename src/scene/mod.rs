//! Keyed drawables and their incremental reconciliation.

mod build;
mod highlight;
mod key;
mod primitive;
mod reconcile;

pub use build::{Scene, health_color, tenant_color};
pub use highlight::relevant_keys;
pub use key::{LogicalKey, PrimitiveKind};
pub use primitive::{Primitive, Rgba, Shape};
pub use reconcile::{
    DeltaEntry, EntryHandle, EntryMetadata, HandleEntry, PreviousState, SceneCache, SceneDelta,
    SceneEntry, reconcile,
};
