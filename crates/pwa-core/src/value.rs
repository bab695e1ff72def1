//! Storage-level value types for cached per-event data.

use std::ops::{Add, AddAssign, Index, Mul};

use serde::{Deserialize, Serialize};

pub use num_complex::Complex64;

/// Energy-momentum four-vector stored as `(e, px, py, pz)`.
///
/// This is a storage type with the Minkowski norm attached; boosts, rotations
/// and angle extraction live outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourVector([f64; 4]);

impl FourVector {
    /// The zero four-vector.
    pub const ZERO: FourVector = FourVector([0.0; 4]);

    /// Creates a four-vector from its components.
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self([e, px, py, pz])
    }

    /// Creates a four-vector from a component array.
    pub fn from_array(components: [f64; 4]) -> Self {
        Self(components)
    }

    /// Returns the energy component.
    pub fn e(&self) -> f64 {
        self.0[0]
    }

    /// Returns the x momentum component.
    pub fn px(&self) -> f64 {
        self.0[1]
    }

    /// Returns the y momentum component.
    pub fn py(&self) -> f64 {
        self.0[2]
    }

    /// Returns the z momentum component.
    pub fn pz(&self) -> f64 {
        self.0[3]
    }

    /// Returns the component array.
    pub fn as_array(&self) -> [f64; 4] {
        self.0
    }

    /// Returns the Minkowski interval `e^2 - px^2 - py^2 - pz^2`.
    pub fn interval(&self) -> f64 {
        self.0[0] * self.0[0]
            - self.0[1] * self.0[1]
            - self.0[2] * self.0[2]
            - self.0[3] * self.0[3]
    }

    /// Returns the invariant mass, clamping spacelike intervals to zero.
    pub fn mass(&self) -> f64 {
        self.interval().max(0.0).sqrt()
    }
}

impl Index<usize> for FourVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
            self.0[3] + rhs.0[3],
        ])
    }
}

impl AddAssign for FourVector {
    fn add_assign(&mut self, rhs: FourVector) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs += rhs;
        }
    }
}

impl Mul<f64> for FourVector {
    type Output = FourVector;

    fn mul(self, rhs: f64) -> FourVector {
        FourVector(self.0.map(|component| component * rhs))
    }
}

impl std::iter::Sum for FourVector {
    fn sum<I: Iterator<Item = FourVector>>(iter: I) -> FourVector {
        iter.fold(FourVector::ZERO, Add::add)
    }
}
