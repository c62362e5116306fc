//! 2D axis-aligned integer rectangle in the XZ plane

/// Axis-aligned rectangle over lattice coordinates, inclusive on all edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRect {
    pub xmin: i32,
    pub zmin: i32,
    pub xmax: i32,
    pub zmax: i32,
}

impl IntRect {
    /// Creates a rectangle from min/max corners
    pub const fn new(xmin: i32, zmin: i32, xmax: i32, zmax: i32) -> Self {
        Self {
            xmin,
            zmin,
            xmax,
            zmax,
        }
    }

    /// Checks that min bounds do not exceed max bounds
    pub fn is_valid(&self) -> bool {
        self.xmin <= self.xmax && self.zmin <= self.zmax
    }

    /// Checks if the point lies inside the rectangle
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.xmin && x <= self.xmax && z >= self.zmin && z <= self.zmax
    }

    /// Checks if this rectangle overlaps another
    pub fn overlaps(&self, other: &IntRect) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.zmin <= other.zmax
            && self.zmax >= other.zmin
    }

    /// Expands the rectangle to include a point
    pub fn expand_point(&mut self, x: i32, z: i32) {
        self.xmin = self.xmin.min(x);
        self.xmax = self.xmax.max(x);
        self.zmin = self.zmin.min(z);
        self.zmax = self.zmax.max(z);
    }

    /// A rectangle that contains nothing and expands from any point
    pub fn empty() -> Self {
        Self {
            xmin: i32::MAX,
            zmin: i32::MAX,
            xmax: i32::MIN,
            zmax: i32::MIN,
        }
    }
}
