//! Hit traits and types for calorimeter data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Position in the detector frame (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (beam axis).
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the transverse (x, y) plane.
    #[inline]
    #[must_use]
    pub fn planar_distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Full 3D Euclidean distance.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Core data structure for a single calibrated calorimeter hit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitData {
    /// Stable detector identifier.
    pub id: u32,
    /// X position (mm).
    pub x: f64,
    /// Y position (mm).
    pub y: f64,
    /// Z position (mm).
    pub z: f64,
    /// Reconstructed energy (MeV).
    pub energy: f64,
}

impl HitData {
    /// Creates a new hit.
    #[inline]
    #[must_use]
    pub fn new(id: u32, x: f64, y: f64, z: f64, energy: f64) -> Self {
        Self { id, x, y, z, energy }
    }

    /// Creates a hit, rejecting non-finite coordinates or energies.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHit`] if any field is NaN or infinite.
    pub fn try_new(id: u32, x: f64, y: f64, z: f64, energy: f64) -> Result<Self> {
        let fields = [("x", x), ("y", y), ("z", z), ("energy", energy)];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidHit {
                id,
                reason: format!("{name} is not finite ({value})"),
            });
        }
        Ok(Self::new(id, x, y, z, energy))
    }
}

/// Trait for hit data from calorimeters.
///
/// The clustering engine is generic over this trait so detector-specific
/// hit types can be clustered without conversion.
pub trait Hit: Send + Sync {
    /// Returns the stable hit identifier.
    fn id(&self) -> u32;

    /// Returns the hit position.
    fn position(&self) -> Point3;

    /// Returns the calibrated hit energy.
    fn energy(&self) -> f64;

    /// Returns the x coordinate.
    #[inline]
    fn x(&self) -> f64 {
        self.position().x
    }

    /// Returns the y coordinate.
    #[inline]
    fn y(&self) -> f64 {
        self.position().y
    }

    /// Returns the z coordinate.
    #[inline]
    fn z(&self) -> f64 {
        self.position().z
    }
}

impl Hit for HitData {
    #[inline]
    fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    fn position(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    fn z(&self) -> f64 {
        self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_distances() {
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(3.0, 4.0, 12.0);
        assert_relative_eq!(p1.planar_distance(&p2), 5.0);
        assert_relative_eq!(p1.distance(&p2), 13.0);
    }

    #[test]
    fn test_hit_data() {
        let hit = HitData::new(7, 1.5, -2.0, 240.0, 12.5);
        assert_eq!(hit.id(), 7);
        assert_relative_eq!(hit.x(), 1.5);
        assert_relative_eq!(hit.y(), -2.0);
        assert_relative_eq!(hit.z(), 240.0);
        assert_relative_eq!(hit.energy(), 12.5);
        assert_eq!(hit.position(), Point3::new(1.5, -2.0, 240.0));
    }

    #[test]
    fn test_try_new_rejects_non_finite() {
        assert!(HitData::try_new(1, 0.0, 0.0, 0.0, 1.0).is_ok());
        let err = HitData::try_new(2, f64::NAN, 0.0, 0.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("hit 2"));
        assert!(HitData::try_new(3, 0.0, 0.0, 0.0, f64::INFINITY).is_err());
    }
}
