//! Per-voxel sphere buffers coloured by leaf, for visual inspection of a partition.

use std::io::Write;

use glam::{Vec3, Vec4};

use crate::core::Result;
use crate::kdtree::SpatialIndex;

/// Transfer-function palette: (opacity, r, g, b) per entry.
pub const LEAF_PALETTE: [[f32; 4]; 8] = [
    [1.0, 0.28, 0.28, 0.86],
    [1.0, 0.0, 0.0, 0.36],
    [1.0, 0.0, 1.0, 1.0],
    [1.0, 0.0, 0.5, 0.0],
    [1.0, 1.0, 1.0, 0.0],
    [1.0, 1.0, 0.38, 0.0],
    [1.0, 0.42, 0.0, 0.0],
    [1.0, 0.88, 0.3, 0.3],
];

fn palette_rgb(palette: &[[f32; 4]], i: usize) -> Vec3 {
    let [_, r, g, b] = palette[i];
    Vec3::new(r, g, b)
}

/// Colour for leaf `index` out of `count`.
///
/// With no more leaves than palette entries each leaf gets its own entry.
/// Otherwise leaves either cycle through the palette or sample it as a
/// linear ramp. An empty palette yields white.
pub fn leaf_color(index: usize, count: usize, palette: &[[f32; 4]], cyclic: bool) -> Vec3 {
    let entries = palette.len();
    if entries == 0 {
        return Vec3::ONE;
    }
    if count <= entries {
        return palette_rgb(palette, index);
    }
    if cyclic {
        return palette_rgb(palette, index % entries);
    }
    let a = index as f32 / (count - 1) as f32 * (entries - 1) as f32;
    let lo = (a.floor() as usize).min(entries - 1);
    let hi = (lo + 1).min(entries - 1);
    let frac = a - lo as f32;
    palette_rgb(palette, lo).lerp(palette_rgb(palette, hi), frac)
}

fn to_rgba8(c: Vec3) -> [u8; 4] {
    let c = (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// One sphere per voxel, `(center, radius)` packed in a `Vec4`, with matching colours.
#[derive(Clone, Debug, Default)]
pub struct SphereBuffers {
    pub spheres: Vec<Vec4>,
    pub colors: Vec<[u8; 4]>,
}

impl SphereBuffers {
    /// Spheres in world units, coloured by the leaf each voxel belongs to.
    pub fn from_index(index: &SpatialIndex, cyclic: bool) -> Self {
        let descriptor = index.descriptor();
        let radius = descriptor.half_cell_width;
        let count = index.leaf_count();

        let mut buffers = Self {
            spheres: Vec::with_capacity(index.voxel_count()),
            colors: Vec::with_capacity(index.voxel_count()),
        };
        for (i, leaf) in index.leaves().iter().enumerate() {
            let color = to_rgba8(leaf_color(i, count, &LEAF_PALETTE, cyclic));
            for voxel in &leaf.voxels {
                buffers.spheres.push(descriptor.cell_center(voxel.lower).extend(radius));
                buffers.colors.push(color);
            }
        }
        buffers
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Write the sphere buffer followed by the colour buffer as raw bytes.
    pub fn write_raw<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(bytemuck::cast_slice(&self.spheres))?;
        out.write_all(bytemuck::cast_slice(&self.colors))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use crate::amr::{AmrData, LevelDataset};
    use crate::kdtree::{BuildConfig, PartitionBuilder};

    #[test]
    fn test_direct_palette_lookup() {
        assert_eq!(leaf_color(2, 4, &LEAF_PALETTE, false), Vec3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_palette_is_white() {
        assert_eq!(leaf_color(0, 0, &[], false), Vec3::ONE);
        assert_eq!(leaf_color(3, 10, &[], true), Vec3::ONE);
        assert_eq!(leaf_color(3, 10, &[], false), Vec3::ONE);
    }

    #[test]
    fn test_cyclic_palette() {
        assert_eq!(leaf_color(9, 20, &LEAF_PALETTE, true), leaf_color(1, 8, &LEAF_PALETTE, true));
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(leaf_color(0, 15, &LEAF_PALETTE, false), Vec3::new(0.28, 0.28, 0.86));
        let last = leaf_color(14, 15, &LEAF_PALETTE, false);
        assert!((last - Vec3::new(0.88, 0.3, 0.3)).length() < 1e-5);
        // Halfway between entries 0 and 1
        let mid = leaf_color(1, 15, &LEAF_PALETTE, false);
        assert!((mid - Vec3::new(0.14, 0.14, 0.61)).length() < 1e-5);
    }

    #[test]
    fn test_sphere_buffers() {
        let mut dataset = LevelDataset::from_positions(0, [IVec3::ZERO, IVec3::X, IVec3::new(3, 0, 0)]);
        dataset.set_scale(1.0, 2.0);
        let mut data = AmrData::default();
        data.levels.insert(0, dataset);
        let index = PartitionBuilder::new(BuildConfig::sequential()).build(&data, 0).unwrap();

        let buffers = SphereBuffers::from_index(&index, true);
        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers.spheres[0], Vec4::new(0.25, 0.25, 0.25, 0.25));
        assert_eq!(buffers.colors[0], buffers.colors[1]);
        assert_ne!(buffers.colors[0], buffers.colors[2]);

        let mut bytes = Vec::new();
        buffers.write_raw(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 3 * 16 + 3 * 4);
    }
}
