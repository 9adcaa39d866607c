//! Axis-aligned bounding box in continuous space

use crate::core::types::Vec3;
use super::grid_box::GridBox;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Continuous region covered by the cells of a grid box.
    ///
    /// A cell with lower corner `c` occupies `[c, c + 1)`, so the box
    /// spans `[lower, upper + 1]`.
    pub fn from_cells(cells: &GridBox) -> Self {
        Self {
            min: cells.lower.as_vec3(),
            max: (cells.upper + 1).as_vec3(),
        }
    }

    /// Scale both corners, e.g. from grid units into world units
    pub fn scaled(&self, factor: f32) -> Aabb {
        Aabb {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;

    #[test]
    fn test_from_cells_covers_upper_cell() {
        let cells = GridBox::new(IVec3::new(1, 2, 3), IVec3::new(2, 2, 5));
        let aabb = Aabb::from_cells(&cells);
        assert_eq!(aabb.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 3.0, 6.0));
        assert_eq!(aabb.scaled(0.5).max, Vec3::new(1.5, 1.5, 3.0));
    }
}
