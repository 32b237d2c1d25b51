use pointer_core::nalgebra::Vector2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Maps undistorted normalized image coordinates to distorted ones and back.
pub trait DistortionModel {
    fn distort(&self, undistorted: Vector2<f64>) -> Vector2<f64>;
    fn undistort(&self, distorted: Vector2<f64>) -> Vector2<f64>;
}

/// Five coefficient [Brown-Conrady][b71] distortion in the order OpenCV uses:
/// `k1, k2, p1, p2, k3`.
///
/// Given normalized coordinates $(x, y)$ and $r^2 = x^2 + y^2$:
///
/// $$
/// x' = x (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + 2 p_1 x y + p_2 (r^2 + 2 x^2)
/// $$
///
/// $$
/// y' = y (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + p_1 (r^2 + 2 y^2) + 2 p_2 x y
/// $$
///
/// [b71]: https://www.asprs.org/wp-content/uploads/pers/1971journal/aug/1971_aug_855-866.pdf
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady5 {
    /// Number of fixed point iterations used by [`DistortionModel::undistort`].
    const UNDISTORT_ITERATIONS: usize = 8;

    /// Builds the model from coefficients in OpenCV order `[k1, k2, p1, p2, k3]`.
    pub fn from_coefficients([k1, k2, p1, p2, k3]: [f64; 5]) -> Self {
        Self { k1, k2, p1, p2, k3 }
    }
}

impl DistortionModel for BrownConrady5 {
    fn distort(&self, undistorted: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (undistorted.x, undistorted.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;
        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }

    fn undistort(&self, distorted: Vector2<f64>) -> Vector2<f64> {
        let mut undistorted = distorted;
        for _ in 0..Self::UNDISTORT_ITERATIONS {
            let error = self.distort(undistorted) - distorted;
            undistorted -= error;
        }
        undistorted
    }
}
