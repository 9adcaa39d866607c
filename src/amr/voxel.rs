//! Voxels grouped by refinement level

use std::collections::BTreeMap;

use glam::IVec3;
use crate::math::GridBox;

/// One grid-aligned cell of a refinement level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// Lower corner in level-local grid units
    pub lower: IVec3,
    /// Refinement level this voxel belongs to
    pub level: u32,
    /// Index of the record this voxel was decoded from
    pub source_index: usize,
}

impl Voxel {
    pub fn new(lower: IVec3, level: u32, source_index: usize) -> Self {
        Self { lower, level, source_index }
    }
}

/// All voxels of one refinement level plus the level's scale factors.
#[derive(Clone, Debug, Default)]
pub struct LevelDataset {
    pub level: u32,
    /// Cell width in model (finest-grid) units, `2^level`
    pub cell_width_in_model: f32,
    /// Cell width normalized so the coarsest level has width 1
    pub cell_width: f32,
    pub rcp_cell_width: f32,
    pub half_cell_width: f32,
    /// Union of all voxel lower corners
    pub bounds: GridBox,
    pub voxels: Vec<Voxel>,
}

impl LevelDataset {
    /// Empty level; scale factors are filled in by `set_scale`.
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Build a level directly from grid positions, with unit cell width.
    ///
    /// Source indices follow the iteration order.
    pub fn from_positions<I: IntoIterator<Item = IVec3>>(level: u32, positions: I) -> Self {
        let mut dataset = Self::new(level);
        for (i, p) in positions.into_iter().enumerate() {
            dataset.push_voxel(Voxel::new(p, level, i));
        }
        dataset.set_scale(1.0, 1.0);
        dataset
    }

    pub fn push_voxel(&mut self, voxel: Voxel) {
        self.bounds.extend(voxel.lower);
        self.voxels.push(voxel);
    }

    /// Derive the scale factors from the model-space width and the dataset's cell scale.
    pub fn set_scale(&mut self, cell_width_in_model: f32, cell_scale: f32) {
        self.cell_width_in_model = cell_width_in_model;
        self.cell_width = cell_width_in_model / cell_scale;
        self.half_cell_width = 0.5 * self.cell_width;
        self.rcp_cell_width = 1.0 / self.cell_width;
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

/// A decoded AMR dataset: voxels bucketed by level.
#[derive(Clone, Debug, Default)]
pub struct AmrData {
    /// Source-space position all voxel positions are relative to
    pub amr_origin: IVec3,
    /// `2^max_level`; maps model widths to normalized widths
    pub cell_scale: f32,
    pub levels: BTreeMap<u32, LevelDataset>,
}

impl AmrData {
    pub fn level(&self, level: u32) -> Option<&LevelDataset> {
        self.levels.get(&level)
    }

    pub fn voxel_count(&self) -> usize {
        self.levels.values().map(LevelDataset::len).sum()
    }
}
