//! Dense-leaf kd-tree over one AMR level.
//!
//! The builder recursively splits a level's voxel set until every region
//! is completely filled by voxels, then stores that region as a leaf. Nodes
//! live in one arena; an inner node's children always occupy two adjacent
//! slots, so only the left child's index is stored.

pub mod node;
pub mod split;
pub mod builder;
pub mod index;
pub mod config;

pub use node::{KdNode, Leaf};
pub use builder::{PartitionBuilder, build_all};
pub use index::{SpatialIndex, LevelDescriptor, VoxelHit, RayHit};
pub use config::BuildConfig;
