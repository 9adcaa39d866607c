//! Dense-leaf kd-tree construction.
//!
//! `PartitionBuilder` splits a level's voxels top-down. A region becomes a
//! leaf as soon as its voxel count equals the number of cells in its
//! bounding box; otherwise it is split along its longest axis at the
//! occupancy seam closest to the middle (see `split`).
//!
//! Large regions can build their two halves on separate rayon tasks. Each
//! task fills a private `Subtree` that is spliced back into the parent's
//! arena in exactly the order a sequential build would have produced, so
//! the output does not depend on scheduling.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;

use crate::amr::{AmrData, LevelDataset, Voxel};
use crate::core::{Error, Result};
use crate::math::GridBox;
use super::config::BuildConfig;
use super::index::{LevelDescriptor, SpatialIndex};
use super::node::{KdNode, Leaf};
use super::split::{best_split_position, choose_split_axis};

/// Builds a `SpatialIndex` for one level of an `AmrData` set.
#[derive(Clone, Debug, Default)]
pub struct PartitionBuilder {
    config: BuildConfig,
}

impl PartitionBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build the index of `level`.
    ///
    /// Fails with `LevelNotFound` before doing any work if the level is absent.
    pub fn build(&self, data: &AmrData, level: u32) -> Result<SpatialIndex> {
        let dataset = data.level(level).ok_or(Error::LevelNotFound(level))?;
        self.build_level(dataset)
    }

    /// Build the index of a single level dataset.
    pub fn build_level(&self, dataset: &LevelDataset) -> Result<SpatialIndex> {
        let bounds = tight_bounds(dataset)?;
        if bounds != dataset.bounds && !dataset.is_empty() {
            log::warn!(
                "Level {} bounds {:?} do not match its voxels {:?}; using the voxel bounds",
                dataset.level, dataset.bounds, bounds
            );
        }

        let start = Instant::now();
        let mut tree = Subtree::with_root();
        if !dataset.is_empty() {
            self.partition(&mut tree, 0, bounds, dataset.voxels.clone());
        }

        let index = SpatialIndex::from_parts(
            LevelDescriptor::from_dataset(dataset, bounds),
            tree.nodes,
            tree.leaves,
        );

        log::info!(
            "Level {}: {} voxels -> {} nodes, {} leaves, depth {} in {:.1}ms",
            dataset.level,
            dataset.len(),
            index.nodes().len(),
            index.leaf_count(),
            index.depth(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if self.config.validate {
            index.validate()?;
        }
        Ok(index)
    }

    /// Recursively populate `node` with the subtree for `voxels`.
    ///
    /// `voxels` is never empty and `bounds` is the union of their lower corners.
    fn partition(&self, tree: &mut Subtree, node: usize, bounds: GridBox, voxels: Vec<Voxel>) {
        debug_assert!(!voxels.is_empty());

        if bounds.cell_count() == voxels.len() as u64 {
            tree.make_leaf(node, bounds, voxels);
            return;
        }

        let axis = choose_split_axis(bounds.extent());
        let position = best_split_position(&bounds, &voxels, axis);
        let count = voxels.len();
        let (left, right) = split_voxels(voxels, axis, position);
        debug_assert!(!left.voxels.is_empty() && !right.voxels.is_empty());

        if self.config.parallel && count >= self.config.parallel_min_voxels {
            let (left_tree, right_tree) = rayon::join(
                || self.subtree(left.bounds, left.voxels),
                || self.subtree(right.bounds, right.voxels),
            );
            tree.splice(node, axis, position, left_tree, right_tree);
        } else {
            let left_child = tree.make_inner(node, axis, position);
            self.partition(tree, left_child, left.bounds, left.voxels);
            self.partition(tree, left_child + 1, right.bounds, right.voxels);
        }
    }

    fn subtree(&self, bounds: GridBox, voxels: Vec<Voxel>) -> Subtree {
        let mut tree = Subtree::with_root();
        self.partition(&mut tree, 0, bounds, voxels);
        tree
    }
}

/// Build every level of `data`, one rayon task per level.
pub fn build_all(data: &AmrData, config: &BuildConfig) -> Result<BTreeMap<u32, SpatialIndex>> {
    let builder = PartitionBuilder::new(config.clone());
    data.levels
        .par_iter()
        .map(|(&level, dataset)| builder.build_level(dataset).map(|index| (level, index)))
        .collect()
}

/// Union of the voxels' lower corners; rejects repeated positions.
fn tight_bounds(dataset: &LevelDataset) -> Result<GridBox> {
    let mut seen = HashSet::with_capacity(dataset.len());
    let mut bounds = GridBox::EMPTY;
    for voxel in &dataset.voxels {
        if !seen.insert(voxel.lower) {
            return Err(Error::DuplicateVoxel {
                level: dataset.level,
                position: voxel.lower,
            });
        }
        bounds.extend(voxel.lower);
    }
    Ok(bounds)
}

/// One side of a split.
struct Half {
    bounds: GridBox,
    voxels: Vec<Voxel>,
}

fn split_voxels(voxels: Vec<Voxel>, axis: usize, position: i32) -> (Half, Half) {
    let mut left = Half { bounds: GridBox::EMPTY, voxels: Vec::new() };
    let mut right = Half { bounds: GridBox::EMPTY, voxels: Vec::new() };
    for voxel in voxels {
        let side = if voxel.lower[axis] <= position { &mut left } else { &mut right };
        side.bounds.extend(voxel.lower);
        side.voxels.push(voxel);
    }
    (left, right)
}

/// Node and leaf arenas under construction. Node 0 is the subtree root.
#[derive(Debug, Default)]
struct Subtree {
    nodes: Vec<KdNode>,
    leaves: Vec<Leaf>,
}

impl Subtree {
    fn with_root() -> Self {
        Self {
            nodes: vec![KdNode::Empty],
            leaves: Vec::new(),
        }
    }

    fn make_leaf(&mut self, node: usize, bounds: GridBox, voxels: Vec<Voxel>) {
        self.nodes[node] = KdNode::Leaf { leaf: self.leaves.len() as u32 };
        self.leaves.push(Leaf { bounds, voxels });
    }

    /// Turn `node` into an inner node and allocate its child pair; returns the left child.
    fn make_inner(&mut self, node: usize, axis: usize, position: i32) -> usize {
        let left_child = self.nodes.len();
        self.nodes[node] = KdNode::Inner {
            axis: axis as u8,
            position,
            left_child: left_child as u32,
        };
        self.nodes.push(KdNode::Empty);
        self.nodes.push(KdNode::Empty);
        left_child
    }

    /// Attach two independently built subtrees as the children of `node`.
    ///
    /// Layout matches a sequential build: the child pair, then every
    /// remaining node of the left subtree, then those of the right one.
    fn splice(&mut self, node: usize, axis: usize, position: i32, left: Subtree, right: Subtree) {
        let left_child = self.make_inner(node, axis, position);
        let left_rest = left_child + 2;
        let left_moves = Relocation {
            root: left_child,
            rest: left_rest,
            leaf_offset: self.leaves.len(),
        };
        let right_moves = Relocation {
            root: left_child + 1,
            rest: left_rest + left.nodes.len() - 1,
            leaf_offset: self.leaves.len() + left.leaves.len(),
        };

        self.nodes[left_child] = left_moves.apply(left.nodes[0]);
        self.nodes[left_child + 1] = right_moves.apply(right.nodes[0]);
        self.nodes.extend(left.nodes[1..].iter().map(|&n| left_moves.apply(n)));
        self.nodes.extend(right.nodes[1..].iter().map(|&n| right_moves.apply(n)));
        self.leaves.extend(left.leaves);
        self.leaves.extend(right.leaves);
    }
}

/// Index translation from a subtree's local arenas into its parent's.
struct Relocation {
    /// Where the subtree root lands
    root: usize,
    /// Where local node 1 lands; later nodes follow contiguously
    rest: usize,
    leaf_offset: usize,
}

impl Relocation {
    fn node_index(&self, local: usize) -> usize {
        if local == 0 { self.root } else { self.rest + local - 1 }
    }

    fn apply(&self, node: KdNode) -> KdNode {
        match node {
            KdNode::Inner { axis, position, left_child } => KdNode::Inner {
                axis,
                position,
                left_child: self.node_index(left_child as usize) as u32,
            },
            KdNode::Leaf { leaf } => KdNode::Leaf {
                leaf: (self.leaf_offset + leaf as usize) as u32,
            },
            KdNode::Empty => KdNode::Empty,
        }
    }
}
