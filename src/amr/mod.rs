//! AMR input data: per-level voxel sets and the raw hexahedron importer.
//!
//! The importer decodes source records into `AmrData`; everything downstream
//! (the kd-tree builder in particular) only reads `LevelDataset`s.

pub mod voxel;
pub mod importer;

pub use voxel::{Voxel, LevelDataset, AmrData};
pub use importer::{Hexahedron, import_hexahedra, import_file, read_hexahedra};
