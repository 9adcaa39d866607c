//! Dense-leaf kd-tree partitioning of adaptive-mesh-refinement voxel levels

pub mod core;
pub mod math;
pub mod amr;
pub mod kdtree;
pub mod geometry;
