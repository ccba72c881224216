//! Multi-tenant service topology layout.
//!
//! Turns a flat `(nodes, edges)` snapshot into positioned, routed and
//! detail-graded drawables keyed by stable identity, plus the incremental
//! delta a renderer needs to keep its objects in sync.

pub mod engine;
pub mod geometry;
pub mod layout;
pub mod lod;
pub mod magistral;
pub mod routing;
pub mod scene;
pub mod settings;
pub mod topology;
pub mod util;
