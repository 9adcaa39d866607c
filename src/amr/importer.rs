//! Raw hexahedron record import.
//!
//! The source file is a flat array of fixed-size records, each holding the
//! lower corner of a cell in finest-grid units and the cell's refinement
//! level. Coordinates are rebased on the first record and divided down to
//! the level's own grid.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::core::{Error, Result};
use super::{AmrData, LevelDataset, Voxel};

/// Largest level whose cell width `2^level` still fits an `i32`.
pub const MAX_LEVEL: u32 = 30;

/// One source record, 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Hexahedron {
    pub lower: [i32; 3],
    pub level: i32,
}

impl Hexahedron {
    pub const SIZE: usize = std::mem::size_of::<Hexahedron>();

    pub fn new(lower: IVec3, level: i32) -> Self {
        Self { lower: lower.to_array(), level }
    }
}

/// Decode a byte buffer into records.
///
/// The buffer need not be aligned; its length must be a whole number of records.
pub fn read_hexahedra(bytes: &[u8]) -> Result<Vec<Hexahedron>> {
    if bytes.len() % Hexahedron::SIZE != 0 {
        return Err(Error::Import(format!(
            "file size {} is not a multiple of the {}-byte record size",
            bytes.len(),
            Hexahedron::SIZE
        )));
    }
    Ok(bytes
        .chunks_exact(Hexahedron::SIZE)
        .map(bytemuck::pod_read_unaligned::<Hexahedron>)
        .collect())
}

/// Read and decode a hexahedron file.
pub fn import_file(path: &Path) -> Result<AmrData> {
    let bytes = std::fs::read(path)?;
    let hexes = read_hexahedra(&bytes)?;
    log::info!("File {}: {} bytes, {} hexes", path.display(), bytes.len(), hexes.len());
    import_hexahedra(&hexes)
}

/// Bucket records by level and normalize their positions to each level's grid.
pub fn import_hexahedra(hexes: &[Hexahedron]) -> Result<AmrData> {
    let mut data = AmrData::default();
    let Some(first) = hexes.first() else {
        data.cell_scale = 1.0;
        return Ok(data);
    };
    data.amr_origin = IVec3::from_array(first.lower);

    let mut max_level = 0u32;
    let mut misaligned = 0usize;

    for (i, h) in hexes.iter().enumerate() {
        let level = u32::try_from(h.level)
            .ok()
            .filter(|&l| l <= MAX_LEVEL)
            .ok_or_else(|| Error::Import(format!("record {} has invalid level {}", i, h.level)))?;
        max_level = max_level.max(level);

        let width = 1i32 << level;
        let offset = IVec3::from_array(h.lower) - data.amr_origin;
        if offset.rem_euclid(IVec3::splat(width)) != IVec3::ZERO {
            misaligned += 1;
        }
        let lower = offset.div_euclid(IVec3::splat(width));

        data.levels
            .entry(level)
            .or_insert_with(|| LevelDataset::new(level))
            .push_voxel(Voxel::new(lower, level, i));
    }

    if misaligned > 0 {
        log::warn!("{} records are not aligned to their level's cell width; positions were floored", misaligned);
    }

    // Cell width in model space. Scale to 1 in world space
    data.cell_scale = (1u64 << max_level) as f32;
    for (&level, dataset) in data.levels.iter_mut() {
        dataset.set_scale((1u64 << level) as f32, data.cell_scale);
        log::info!(
            "Level {} Num: {} bounds {:?}..={:?}",
            level, dataset.len(), dataset.bounds.lower, dataset.bounds.upper
        );
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_record_size() {
        assert_eq!(Hexahedron::SIZE, 16);
    }

    #[test]
    fn test_read_rejects_partial_record() {
        let bytes = vec![0u8; Hexahedron::SIZE + 3];
        assert!(matches!(read_hexahedra(&bytes), Err(Error::Import(_))));
    }

    #[test]
    fn test_read_unaligned_buffer() {
        let hexes = [Hexahedron::new(IVec3::new(1, 2, 3), 4), Hexahedron::new(IVec3::new(-5, 6, 7), 0)];
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(bytemuck::cast_slice(&hexes));
        let decoded = read_hexahedra(&bytes[1..]).unwrap();
        assert_eq!(decoded, hexes);
    }

    #[test]
    fn test_import_buckets_and_scales_levels() {
        let hexes = [
            Hexahedron::new(IVec3::new(100, 100, 100), 0),
            Hexahedron::new(IVec3::new(101, 100, 100), 0),
            Hexahedron::new(IVec3::new(104, 100, 100), 2),
            Hexahedron::new(IVec3::new(108, 104, 100), 2),
        ];
        let data = import_hexahedra(&hexes).unwrap();

        assert_eq!(data.amr_origin, IVec3::splat(100));
        assert_eq!(data.cell_scale, 4.0);
        assert_eq!(data.voxel_count(), 4);

        let fine = data.level(0).unwrap();
        assert_eq!(fine.voxels[1].lower, IVec3::new(1, 0, 0));
        assert_eq!(fine.cell_width, 0.25);
        assert_eq!(fine.rcp_cell_width, 4.0);

        let coarse = data.level(2).unwrap();
        assert_eq!(coarse.voxels[0].lower, IVec3::new(1, 0, 0));
        assert_eq!(coarse.voxels[1].lower, IVec3::new(2, 1, 0));
        assert_eq!(coarse.voxels[1].source_index, 3);
        assert_eq!(coarse.cell_width, 1.0);
        assert_eq!(coarse.bounds.upper, IVec3::new(2, 1, 0));
        assert!(data.level(1).is_none());
    }

    #[test]
    fn test_import_rejects_negative_level() {
        let hexes = [Hexahedron::new(IVec3::ZERO, -1)];
        assert!(matches!(import_hexahedra(&hexes), Err(Error::Import(_))));
    }

    #[test]
    fn test_import_empty_input() {
        let data = import_hexahedra(&[]).unwrap();
        assert!(data.levels.is_empty());
        assert_eq!(data.cell_scale, 1.0);
    }

    #[test]
    fn test_import_file() {
        let hexes = [Hexahedron::new(IVec3::ZERO, 1), Hexahedron::new(IVec3::new(2, 0, 0), 1)];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytemuck::cast_slice(&hexes)).unwrap();
        file.flush().unwrap();

        let data = import_file(file.path()).unwrap();
        let level = data.level(1).unwrap();
        assert_eq!(level.len(), 2);
        assert_eq!(level.voxels[1].lower, IVec3::X);
    }
}
