//! Finished per-level spatial index and its queries

use std::collections::HashSet;

use glam::{IVec3, Vec3};

use crate::amr::{LevelDataset, Voxel};
use crate::core::{Error, Result};
use crate::math::{Aabb, GridBox, Ray};
use super::node::{KdNode, Leaf};

/// Scale factors and extent of the level an index was built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelDescriptor {
    pub level: u32,
    pub cell_width_in_model: f32,
    pub cell_width: f32,
    pub rcp_cell_width: f32,
    pub half_cell_width: f32,
    /// Union of all voxel lower corners, in grid units
    pub bounds: GridBox,
}

impl LevelDescriptor {
    pub fn from_dataset(dataset: &LevelDataset, bounds: GridBox) -> Self {
        Self {
            level: dataset.level,
            cell_width_in_model: dataset.cell_width_in_model,
            cell_width: dataset.cell_width,
            rcp_cell_width: dataset.rcp_cell_width,
            half_cell_width: dataset.half_cell_width,
            bounds,
        }
    }

    /// Grid cell containing a world-space point
    pub fn world_to_grid(&self, p: Vec3) -> IVec3 {
        (p * self.rcp_cell_width).floor().as_ivec3()
    }

    /// World-space center of a grid cell
    pub fn cell_center(&self, cell: IVec3) -> Vec3 {
        (cell.as_vec3() + Vec3::splat(0.5)) * self.cell_width
    }
}

/// Result of a point lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelHit {
    pub leaf: usize,
    pub voxel: Voxel,
}

/// Nearest leaf hit along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub leaf: usize,
    /// Entry distance, in the units of the ray that was traced
    pub t: f32,
    /// First voxel of the leaf the ray enters
    pub voxel: Voxel,
}

/// Kd-tree over one AMR level whose leaves are fully dense voxel boxes.
///
/// Node 0 is the root. Immutable once built.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    descriptor: LevelDescriptor,
    nodes: Vec<KdNode>,
    leaves: Vec<Leaf>,
}

impl SpatialIndex {
    pub(crate) fn from_parts(descriptor: LevelDescriptor, nodes: Vec<KdNode>, leaves: Vec<Leaf>) -> Self {
        Self { descriptor, nodes, leaves }
    }

    pub fn descriptor(&self) -> &LevelDescriptor {
        &self.descriptor
    }

    pub fn level(&self) -> u32 {
        self.descriptor.level
    }

    /// Bounds of the whole level in grid units
    pub fn bounds(&self) -> GridBox {
        self.descriptor.bounds
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }

    /// Leaves in build order
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn voxel_count(&self) -> usize {
        self.leaves.iter().map(|l| l.voxels.len()).sum()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some((left, right)) = self.nodes[node].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Find the voxel whose lower corner is `cell`.
    pub fn locate(&self, cell: IVec3) -> Option<VoxelHit> {
        if !self.bounds().contains(cell) {
            return None;
        }
        let mut node = 0;
        loop {
            match self.nodes[node] {
                KdNode::Inner { axis, position, left_child } => {
                    let left = left_child as usize;
                    node = if cell[axis as usize] <= position { left } else { left + 1 };
                }
                KdNode::Leaf { leaf } => {
                    let leaf = leaf as usize;
                    return self.leaves[leaf]
                        .voxel_at(cell)
                        .map(|&voxel| VoxelHit { leaf, voxel });
                }
                KdNode::Empty => return None,
            }
        }
    }

    /// Find the voxel containing a world-space point.
    pub fn locate_world(&self, p: Vec3) -> Option<VoxelHit> {
        self.locate(self.descriptor.world_to_grid(p))
    }

    /// Indices of all leaves whose bounds overlap `query`, in build order.
    pub fn leaves_in_box(&self, query: &GridBox) -> Vec<usize> {
        let mut found = Vec::new();
        if !self.bounds().intersects(query) {
            return found;
        }
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            match self.nodes[node] {
                KdNode::Inner { axis, position, left_child } => {
                    let axis = axis as usize;
                    let left = left_child as usize;
                    // Right first so the left subtree pops first
                    if query.upper[axis] > position {
                        stack.push(left + 1);
                    }
                    if query.lower[axis] <= position {
                        stack.push(left);
                    }
                }
                KdNode::Leaf { leaf } => {
                    if self.leaves[leaf as usize].bounds.intersects(query) {
                        found.push(leaf as usize);
                    }
                }
                KdNode::Empty => {}
            }
        }
        found
    }

    /// Bounds of the whole level in world units
    pub fn world_bounds(&self) -> Aabb {
        Aabb::from_cells(&self.bounds()).scaled(self.descriptor.cell_width)
    }

    /// Nearest leaf hit by a world-space ray; `t` is a world-space distance.
    pub fn intersect_ray_world(&self, ray: &Ray) -> Option<RayHit> {
        let hit = self.intersect_ray(&ray.scaled(self.descriptor.rcp_cell_width))?;
        Some(RayHit {
            t: hit.t * self.descriptor.cell_width,
            ..hit
        })
    }

    /// Nearest leaf hit by a ray given in grid units.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        if self.bounds().is_empty() {
            return None;
        }
        let (_, t_far) = ray.intersects_aabb(&Aabb::from_cells(&self.bounds()))?;
        self.intersect_node(0, ray, t_far)
    }

    fn intersect_node(&self, node: usize, ray: &Ray, t_far: f32) -> Option<RayHit> {
        match self.nodes[node] {
            KdNode::Inner { axis, position, left_child } => {
                let axis = axis as usize;
                let left = left_child as usize;
                // Cells left of the split end where the first right cell begins
                let plane = (position as i64 + 1) as f32;
                let origin = ray.origin[axis];
                let direction = ray.direction[axis];

                // Parallel to the plane: only the side holding the origin, the plane counting as right
                if direction == 0.0 {
                    let side = if origin < plane { left } else { left + 1 };
                    return self.intersect_node(side, ray, t_far);
                }

                let left_first = origin < plane || (origin == plane && direction < 0.0);
                let (near, far) = if left_first { (left, left + 1) } else { (left + 1, left) };

                if let Some(hit) = self.intersect_node(near, ray, t_far) {
                    return Some(hit);
                }
                let t_split = (plane - origin) * ray.inv_direction[axis];
                if t_split >= 0.0 && t_split <= t_far {
                    self.intersect_node(far, ray, t_far)
                } else {
                    None
                }
            }
            KdNode::Leaf { leaf } => {
                let leaf_index = leaf as usize;
                let leaf = &self.leaves[leaf_index];
                let (t_near, _) = ray.intersects_aabb(&Aabb::from_cells(&leaf.bounds))?;
                let cell = ray
                    .at(t_near)
                    .floor()
                    .as_ivec3()
                    .clamp(leaf.bounds.lower, leaf.bounds.upper);
                leaf.voxel_at(cell).map(|&voxel| RayHit { leaf: leaf_index, t: t_near, voxel })
            }
            KdNode::Empty => None,
        }
    }

    /// Check the structural invariants of the index.
    ///
    /// Every node must be reachable exactly once from the root, children
    /// must be in range, every leaf must be referenced exactly once, be dense,
    /// and have bounds equal to its voxels' union, and no voxel position may
    /// appear twice.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidIndex(msg));

        if self.nodes.is_empty() {
            return invalid("index has no root node".into());
        }
        if self.nodes[0] == KdNode::Empty {
            if self.nodes.len() == 1 && self.leaves.is_empty() {
                return Ok(());
            }
            return invalid("empty root with nodes or leaves attached".into());
        }

        let mut node_seen = vec![false; self.nodes.len()];
        let mut leaf_seen = vec![false; self.leaves.len()];
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut node_seen[node], true) {
                return invalid(format!("node {} reached twice", node));
            }
            match self.nodes[node] {
                KdNode::Inner { axis, left_child, .. } => {
                    let left = left_child as usize;
                    if axis > 2 {
                        return invalid(format!("node {} splits on axis {}", node, axis));
                    }
                    if left <= node || left + 1 >= self.nodes.len() {
                        return invalid(format!("node {} has children {} out of range", node, left));
                    }
                    stack.push(left);
                    stack.push(left + 1);
                }
                KdNode::Leaf { leaf } => {
                    let leaf = leaf as usize;
                    if leaf >= self.leaves.len() {
                        return invalid(format!("node {} references missing leaf {}", node, leaf));
                    }
                    if std::mem::replace(&mut leaf_seen[leaf], true) {
                        return invalid(format!("leaf {} referenced twice", leaf));
                    }
                }
                KdNode::Empty => return invalid(format!("non-root node {} is empty", node)),
            }
        }
        if let Some(node) = node_seen.iter().position(|seen| !seen) {
            return invalid(format!("node {} is unreachable", node));
        }
        if let Some(leaf) = leaf_seen.iter().position(|seen| !seen) {
            return invalid(format!("leaf {} is unreferenced", leaf));
        }

        let mut positions = HashSet::with_capacity(self.voxel_count());
        for (i, leaf) in self.leaves.iter().enumerate() {
            let union = GridBox::from_points(leaf.voxels.iter().map(|v| v.lower));
            if leaf.voxels.is_empty() || union != leaf.bounds {
                return invalid(format!("leaf {} bounds {:?} do not match its voxels", i, leaf.bounds));
            }
            if !leaf.is_dense() {
                return invalid(format!(
                    "leaf {} holds {} voxels but covers {} cells",
                    i, leaf.voxels.len(), leaf.bounds.cell_count()
                ));
            }
            for voxel in &leaf.voxels {
                if !positions.insert(voxel.lower) {
                    return invalid(format!("voxel {} appears twice", voxel.lower));
                }
            }
        }
        Ok(())
    }
}
