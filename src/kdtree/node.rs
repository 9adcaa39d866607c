//! Tree node and leaf storage

use crate::amr::Voxel;
use crate::math::GridBox;

/// A node in the kd-tree arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KdNode {
    /// Split into two children at `left_child` and `left_child + 1`.
    ///
    /// Voxels whose coordinate on `axis` is `<= position` go left.
    Inner {
        axis: u8,
        position: i32,
        left_child: u32,
    },
    /// Fully dense region stored at `leaves[leaf]`.
    Leaf { leaf: u32 },
    /// Root of a level that holds no voxels. Never produced below the root.
    Empty,
}

impl KdNode {
    /// Child indices of an inner node
    pub fn children(&self) -> Option<(usize, usize)> {
        match *self {
            KdNode::Inner { left_child, .. } => {
                let left = left_child as usize;
                Some((left, left + 1))
            }
            _ => None,
        }
    }
}

/// A box of grid positions together with the voxels that exactly tile it.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub bounds: GridBox,
    pub voxels: Vec<Voxel>,
}

impl Leaf {
    /// True when the voxels fill every cell of `bounds` once (given no duplicates).
    pub fn is_dense(&self) -> bool {
        self.bounds.cell_count() == self.voxels.len() as u64
    }

    /// Voxel with the given lower corner, if the leaf holds it
    pub fn voxel_at(&self, position: glam::IVec3) -> Option<&Voxel> {
        if !self.bounds.contains(position) {
            return None;
        }
        self.voxels.iter().find(|v| v.lower == position)
    }
}
