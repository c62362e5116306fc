//! Fixed-point lattice coordinates
//!
//! All graph topology decisions (vertex identity, winding, containment) run on
//! `Int3` so that two world positions that print the same always hash and
//! compare the same. World units are scaled by [`PRECISION`] on conversion.

use glam::Vec3;
use std::ops::{Add, Sub};

/// World units to lattice units scale factor (1 unit = 1000 lattice steps)
pub const PRECISION: i32 = 1000;

/// Float variant of [`PRECISION`]
pub const PRECISION_F: f32 = 1000.0;

/// Integer-lattice 3D point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Int3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Int3 {
    pub const ZERO: Int3 = Int3 { x: 0, y: 0, z: 0 };

    /// Creates a new lattice point from raw lattice coordinates
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts a world-space position to the lattice, rounding to nearest
    pub fn from_world(v: Vec3) -> Self {
        Self {
            x: (v.x * PRECISION_F).round() as i32,
            y: (v.y * PRECISION_F).round() as i32,
            z: (v.z * PRECISION_F).round() as i32,
        }
    }

    /// Converts back to world space
    pub fn to_world(self) -> Vec3 {
        Vec3::new(
            self.x as f32 / PRECISION_F,
            self.y as f32 / PRECISION_F,
            self.z as f32 / PRECISION_F,
        )
    }

    /// Squared magnitude in lattice units, free of intermediate overflow
    pub fn sq_magnitude(self) -> i64 {
        let x = self.x as i64;
        let y = self.y as i64;
        let z = self.z as i64;
        x * x + y * y + z * z
    }

    /// Euclidean magnitude in lattice units
    pub fn magnitude(self) -> f64 {
        (self.sq_magnitude() as f64).sqrt()
    }

    /// Magnitude rounded to an integer, used as a connection cost
    pub fn cost_magnitude(self) -> u32 {
        self.magnitude().round() as u32
    }
}

impl Add for Int3 {
    type Output = Int3;

    fn add(self, rhs: Int3) -> Int3 {
        Int3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Int3 {
    type Output = Int3;

    fn sub(self, rhs: Int3) -> Int3 {
        Int3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}
