//! Split axis and position selection

use glam::IVec3;

use crate::amr::Voxel;
use crate::math::GridBox;

/// Axis with the largest extent. Ties prefer x, then z, then y.
pub fn choose_split_axis(extent: IVec3) -> usize {
    if extent.x >= extent.y {
        if extent.x >= extent.z { 0 } else { 2 }
    } else if extent.y >= extent.z {
        1
    } else {
        2
    }
}

/// Number of voxels per coordinate along `axis`, indexed from `bounds.lower[axis]`.
pub fn occupancy_histogram(bounds: &GridBox, voxels: &[Voxel], axis: usize) -> Vec<u32> {
    let lower = bounds.lower[axis];
    let mut counts = vec![0u32; bounds.extent()[axis].max(0) as usize];
    for voxel in voxels {
        let slot = (voxel.lower[axis] - lower) as usize;
        counts[slot] += 1;
    }
    counts
}

/// Pick the split coordinate along `axis`; voxels at or below it go left.
///
/// A coordinate `t` is a candidate when the number of voxels at `t` differs
/// from the number at `t + 1`. The candidate closest to the box center wins,
/// the lowest one on ties. Without any candidate the center, rounded down,
/// is used.
pub fn best_split_position(bounds: &GridBox, voxels: &[Voxel], axis: usize) -> i32 {
    let counts = occupancy_histogram(bounds, voxels, axis);
    let lower = bounds.lower[axis];
    let upper = bounds.upper[axis];
    // Distances are compared doubled so the half-integer center stays exact
    let twice_mid = lower as i64 + upper as i64;

    let mut best: Option<(i32, i64)> = None;
    for (i, pair) in counts.windows(2).enumerate() {
        if pair[0] != pair[1] {
            let t = lower + i as i32;
            let distance = (2 * t as i64 - twice_mid).abs();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((t, distance));
            }
        }
    }

    match best {
        Some((t, _)) => t,
        None => {
            let center = lower + (upper - lower) / 2;
            log::debug!(
                "No occupancy change along axis {} in {:?}..={:?} ({} voxels); splitting at center {}",
                axis, bounds.lower, bounds.upper, voxels.len(), center
            );
            center
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voxels_at(points: &[IVec3]) -> Vec<Voxel> {
        points.iter().enumerate().map(|(i, &p)| Voxel::new(p, 0, i)).collect()
    }

    #[test]
    fn test_axis_prefers_largest_extent() {
        assert_eq!(choose_split_axis(IVec3::new(5, 2, 2)), 0);
        assert_eq!(choose_split_axis(IVec3::new(2, 5, 2)), 1);
        assert_eq!(choose_split_axis(IVec3::new(2, 2, 5)), 2);
    }

    #[test]
    fn test_axis_ties() {
        // x == y > z picks x
        assert_eq!(choose_split_axis(IVec3::new(3, 3, 2)), 0);
        // x == z > y picks x
        assert_eq!(choose_split_axis(IVec3::new(3, 2, 3)), 0);
        // y == z > x picks y
        assert_eq!(choose_split_axis(IVec3::new(2, 3, 3)), 1);
        // all equal picks x
        assert_eq!(choose_split_axis(IVec3::splat(4)), 0);
        // x >= y but z larger picks z
        assert_eq!(choose_split_axis(IVec3::new(3, 3, 4)), 2);
    }

    #[test]
    fn test_histogram_counts() {
        let voxels = voxels_at(&[IVec3::new(0, 0, 0), IVec3::new(0, 1, 0), IVec3::new(2, 0, 0)]);
        let bounds = GridBox::from_points(voxels.iter().map(|v| v.lower));
        assert_eq!(occupancy_histogram(&bounds, &voxels, 0), vec![2, 0, 1]);
        assert_eq!(occupancy_histogram(&bounds, &voxels, 1), vec![2, 1]);
    }

    #[test]
    fn test_equidistant_gaps_pick_first() {
        // x-coordinates {0,0,1,1,3,3}: counts 2,2,0,2 -> candidates t=1 and t=2, center 1.5
        let voxels = voxels_at(&[
            IVec3::new(0, 0, 0), IVec3::new(0, 1, 0),
            IVec3::new(1, 0, 0), IVec3::new(1, 1, 0),
            IVec3::new(3, 0, 0), IVec3::new(3, 1, 0),
        ]);
        let bounds = GridBox::new(IVec3::ZERO, IVec3::new(3, 1, 0));
        assert_eq!(best_split_position(&bounds, &voxels, 0), 1);
    }

    #[test]
    fn test_candidate_closest_to_center() {
        // counts along x: 1,1,1,1,1,2,2 -> only candidate at t=4
        let mut points: Vec<IVec3> = (0..7).map(|x| IVec3::new(x, 0, 0)).collect();
        points.push(IVec3::new(5, 1, 0));
        points.push(IVec3::new(6, 1, 0));
        let voxels = voxels_at(&points);
        let bounds = GridBox::from_points(points.iter().copied());
        assert_eq!(best_split_position(&bounds, &voxels, 0), 4);
    }

    #[test]
    fn test_offset_bounds() {
        let voxels = voxels_at(&[IVec3::new(10, 0, 0), IVec3::new(12, 0, 0)]);
        let bounds = GridBox::from_points(voxels.iter().map(|v| v.lower));
        // counts 1,0,1 -> candidates 10 and 11, center 11
        assert_eq!(best_split_position(&bounds, &voxels, 0), 11);
    }

    #[test]
    fn test_no_candidate_falls_back_to_center() {
        // Diagonal: one voxel per x column, so occupancy never changes along x
        let voxels = voxels_at(&[IVec3::new(0, 0, 0), IVec3::new(1, 1, 0)]);
        let bounds = GridBox::from_points(voxels.iter().map(|v| v.lower));
        assert_eq!(best_split_position(&bounds, &voxels, 0), 0);
    }

    #[test]
    fn test_large_coordinates_split_exactly() {
        // Neighbouring coordinates above 2^24 are not distinguishable as f32
        let base = (1 << 25) + 1;
        let voxels = voxels_at(&[IVec3::new(base, 0, 0), IVec3::new(base + 1, 1, 0)]);
        let bounds = GridBox::from_points(voxels.iter().map(|v| v.lower));
        assert_eq!(best_split_position(&bounds, &voxels, 0), base);

        // counts 1,0,1 -> candidates -base and -base + 1; the latter is the center
        let voxels = voxels_at(&[IVec3::new(-base, 0, 0), IVec3::new(-base + 2, 0, 0)]);
        let bounds = GridBox::from_points(voxels.iter().map(|v| v.lower));
        assert_eq!(best_split_position(&bounds, &voxels, 0), -base + 1);
    }
}
