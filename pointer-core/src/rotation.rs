use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Rotation3, Unit, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A rotation in compact axis-angle (Rodrigues) form, as reported by marker pose estimators.
///
/// The direction of the vector is the rotation axis and its norm is the angle in radians.
/// Use [`RotationVector::rotation`] to expand it into a rotation matrix. The expansion is
/// cheap but not free, so callers that need the matrix repeatedly within one frame should
/// keep the [`Rotation3`] around rather than the vector.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RotationVector(pub Vector3<f64>);

impl RotationVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Converts the rotation vector to a rotation matrix using the Rodrigues formula.
    pub fn rotation(self) -> Rotation3<f64> {
        self.into()
    }

    /// Converts the rotation vector into a rotation matrix quickly, but only works when the
    /// rotation is very small.
    pub fn rotation_small(self) -> Rotation3<f64> {
        Rotation3::from_matrix(&(Matrix3::identity() + self.0.cross_matrix()))
    }

    /// The L2 distance between two rotation vectors.
    ///
    /// This compares the raw vectors rather than the rotations they describe, which is what
    /// the sample diversity gate wants: it is cheap and it grows with the change in
    /// orientation between two nearby poses.
    pub fn distance(self, other: Self) -> f64 {
        (self.0 - other.0).norm()
    }
}

/// This is the exponential map.
impl From<RotationVector> for Rotation3<f64> {
    fn from(w: RotationVector) -> Self {
        // Avoid the degenerate axis when the angle is near zero.
        let theta2 = w.0.norm_squared();
        if theta2 <= f64::EPSILON {
            w.rotation_small()
        } else {
            let theta = theta2.sqrt();
            let axis = Unit::new_unchecked(w.0 / theta);
            Self::from_axis_angle(&axis, theta)
        }
    }
}

/// This is the log map.
impl From<Rotation3<f64>> for RotationVector {
    fn from(r: Rotation3<f64>) -> Self {
        let w = r.scaled_axis();
        let w = if w.iter().any(|n| n.is_nan()) {
            Vector3::zeros()
        } else {
            w
        };
        Self(w)
    }
}
