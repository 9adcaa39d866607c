//! Integer box over voxel lower corners

use crate::core::types::IVec3;

/// Inclusive box of grid positions in level-local units.
///
/// `upper` is the largest lower corner contained, not one past it. An
/// empty box has `lower > upper` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridBox {
    pub lower: IVec3,
    pub upper: IVec3,
}

impl Default for GridBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl GridBox {
    /// Box containing no positions; extending it with a point yields that point.
    pub const EMPTY: GridBox = GridBox {
        lower: IVec3::splat(i32::MAX),
        upper: IVec3::splat(i32::MIN),
    };

    pub fn new(lower: IVec3, upper: IVec3) -> Self {
        Self { lower, upper }
    }

    pub fn from_point(p: IVec3) -> Self {
        Self { lower: p, upper: p }
    }

    /// Smallest box containing every point of the iterator
    pub fn from_points<I: IntoIterator<Item = IVec3>>(points: I) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.lower.cmpgt(self.upper).any()
    }

    /// Expand the box to include point
    pub fn extend(&mut self, p: IVec3) {
        self.lower = self.lower.min(p);
        self.upper = self.upper.max(p);
    }

    /// `upper - lower`
    pub fn size(&self) -> IVec3 {
        self.upper - self.lower
    }

    /// Number of cell positions per axis (`size + 1`)
    pub fn extent(&self) -> IVec3 {
        if self.is_empty() {
            IVec3::ZERO
        } else {
            self.size() + IVec3::ONE
        }
    }

    /// Number of cell positions covered; 64-bit so large levels cannot overflow.
    pub fn cell_count(&self) -> u64 {
        let e = self.extent();
        e.x as u64 * e.y as u64 * e.z as u64
    }

    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.lower).all() && p.cmple(self.upper).all()
    }

    pub fn intersects(&self, other: &GridBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.lower.cmple(other.upper).all()
            && self.upper.cmpge(other.lower).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box() {
        let b = GridBox::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.extent(), IVec3::ZERO);
        assert_eq!(b.cell_count(), 0);
        assert!(!b.contains(IVec3::ZERO));
    }

    #[test]
    fn test_extend_from_empty() {
        let mut b = GridBox::default();
        b.extend(IVec3::new(5, 5, 5));
        assert_eq!(b, GridBox::from_point(IVec3::new(5, 5, 5)));
        assert_eq!(b.extent(), IVec3::ONE);
        assert_eq!(b.cell_count(), 1);
    }

    #[test]
    fn test_from_points() {
        let b = GridBox::from_points([IVec3::new(0, 2, 1), IVec3::new(3, 0, 1), IVec3::new(1, 1, 2)]);
        assert_eq!(b.lower, IVec3::new(0, 0, 1));
        assert_eq!(b.upper, IVec3::new(3, 2, 2));
        assert_eq!(b.extent(), IVec3::new(4, 3, 2));
        assert_eq!(b.cell_count(), 24);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let b = GridBox::new(IVec3::ZERO, IVec3::splat(2));
        assert!(b.contains(IVec3::splat(2)));
        assert!(b.contains(IVec3::ZERO));
        assert!(!b.contains(IVec3::new(3, 0, 0)));
        assert!(!b.contains(IVec3::new(0, -1, 0)));
    }

    #[test]
    fn test_intersects() {
        let a = GridBox::new(IVec3::ZERO, IVec3::splat(2));
        let b = GridBox::new(IVec3::splat(2), IVec3::splat(4));
        let c = GridBox::new(IVec3::splat(3), IVec3::splat(4));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&GridBox::EMPTY));
    }
}
