//! Planet mesh generation core
//!
//! Deterministic seeded randomness, the planar surface graph, a spatial
//! index for ray picking, and the cooperative scheduler that runs long
//! generation work in host-driven time slices.

pub mod geometry;
pub mod graph;
pub mod partition;
pub mod pipeline;
pub mod plates;
pub mod random;
pub mod seeds;
pub mod task;
pub mod tectonics;
pub mod topology;
