//! Linear pivot calibration.
//!
//! For every admitted pose `(R_i, t_i)` the tip offset `p` in the marker frame and the
//! stationary tip `g` in the camera frame satisfy
//!
//! ```text
//! R_i * p + t_i = g
//! ```
//!
//! which is linear in the six unknowns `x = [p; g]`:
//!
//! ```text
//! [ R_1 | -I ]         [ -t_1 ]
//! [ R_2 | -I ]  [p]    [ -t_2 ]
//! [  ...     ]  [g]  = [  ... ]
//! [ R_N | -I ]         [ -t_N ]
//! ```
//!
//! The system is solved in the least squares sense through the SVD. Rotations about a single
//! axis leave the component of `p` and `g` along that axis unobservable, which shows up as a
//! vanishing singular value, so the solver checks the conditioning before accepting a result.

use crate::{CalibrationSettings, PivotError};
use log::{debug, info};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use pointer_core::{CalibrationSample, CameraPoint, PivotOffset};

/// The result of a successful pivot solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotCalibration {
    /// The tip offset in the marker frame.
    pub offset: PivotOffset,
    /// The stationary tip position in the camera frame during collection.
    pub pivot: CameraPoint,
    /// Root mean square distance in meters between `R_i * p + t_i` and `g`.
    pub rms_residual: f64,
    /// Ratio of the smallest to the largest singular value of the stacked system.
    pub singular_value_ratio: f64,
}

/// Solves for the pivot offset of a pointer from a batch of marker poses.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PivotSolver {
    minimum_singular_value_ratio: f64,
    epsilon: f64,
}

impl PivotSolver {
    /// The number of unknowns is 6 and each pose contributes 3 equations, but
    /// two poses only constrain rotation about one axis.
    pub const MINIMUM_SAMPLES: usize = 4;

    /// Creates a `PivotSolver` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_settings(settings: &CalibrationSettings) -> Self {
        Self {
            minimum_singular_value_ratio: settings.minimum_singular_value_ratio,
            epsilon: settings.solver_epsilon,
        }
    }

    /// Set the smallest acceptable ratio of the smallest to the largest singular value.
    ///
    /// Setting this to `0.0` accepts rank deficient systems, returning the minimum norm solution.
    ///
    /// Default is `1e-4`.
    #[must_use]
    pub fn minimum_singular_value_ratio(self, minimum_singular_value_ratio: f64) -> Self {
        Self {
            minimum_singular_value_ratio,
            ..self
        }
    }

    /// Set the threshold below which singular values are treated as zero.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Solves for the pivot offset.
    pub fn solve(&self, samples: &[CalibrationSample]) -> Result<PivotCalibration, PivotError> {
        let n = samples.len();
        if n < Self::MINIMUM_SAMPLES {
            return Err(PivotError::NotEnoughSamples {
                required: Self::MINIMUM_SAMPLES,
                got: n,
            });
        }

        let mut a = DMatrix::<f64>::zeros(3 * n, 6);
        let mut b = DVector::<f64>::zeros(3 * n);
        let negative_identity = -Matrix3::<f64>::identity();
        for (i, sample) in samples.iter().enumerate() {
            let row = 3 * i;
            a.fixed_slice_mut::<3, 3>(row, 0)
                .copy_from(sample.rotation.matrix());
            a.fixed_slice_mut::<3, 3>(row, 3)
                .copy_from(&negative_identity);
            b.fixed_rows_mut::<3>(row).copy_from(&(-sample.translation));
        }

        let svd = a.clone().svd(true, true);
        let largest = svd.singular_values.max();
        let smallest = svd.singular_values.min();
        let ratio = if largest > 0.0 { smallest / largest } else { 0.0 };
        debug!(
            "pivot system singular values range from {:.3e} to {:.3e}",
            smallest, largest
        );
        if !(ratio >= self.minimum_singular_value_ratio) {
            return Err(PivotError::DegenerateGeometry {
                ratio,
                threshold: self.minimum_singular_value_ratio,
            });
        }

        let x = svd.solve(&b, self.epsilon).map_err(PivotError::SvdFailed)?;
        let offset = PivotOffset(Vector3::new(x[0], x[1], x[2]));
        let pivot = CameraPoint::new(x[3], x[4], x[5]);
        let residual = &a * &x - &b;
        let rms_residual = (residual.norm_squared() / n as f64).sqrt();
        info!(
            "pivot solved from {} poses: offset length {:.4} m, rms residual {:.2e} m",
            n,
            offset.length(),
            rms_residual
        );

        Ok(PivotCalibration {
            offset,
            pivot,
            rms_residual,
            singular_value_ratio: ratio,
        })
    }
}

impl Default for PivotSolver {
    fn default() -> Self {
        Self::from_settings(&CalibrationSettings::default())
    }
}
