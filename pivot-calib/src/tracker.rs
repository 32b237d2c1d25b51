use pointer_core::{CameraModel, CameraPoint, KeyPoint, MarkerPose, PivotOffset};

/// Computes the live tip position from a calibrated [`PivotOffset`] and the current marker pose.
///
/// This is `R(pose) * offset + pose.translation`, the tip expressed in the camera frame.
pub fn tip_position(pose: &MarkerPose, offset: PivotOffset) -> CameraPoint {
    pose.transform(offset)
}

/// Locates the pointer tip every frame and projects points for overlay rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TipTracker<C> {
    camera: C,
}

impl<C> TipTracker<C>
where
    C: CameraModel,
{
    pub fn new(camera: C) -> Self {
        Self { camera }
    }

    /// See [`tip_position`].
    pub fn tip_position(&self, pose: &MarkerPose, offset: PivotOffset) -> CameraPoint {
        tip_position(pose, offset)
    }

    /// Projects a camera frame point onto the image.
    ///
    /// Returns `None` when the point is not renderable because it lies on or behind the camera plane.
    pub fn project(&self, point: CameraPoint) -> Option<KeyPoint> {
        self.camera.project(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pointer_core::nalgebra::{Point2, Vector2, Vector3};
    use pointer_core::RotationVector;
    use pointer_pinhole::CameraIntrinsics;

    #[test]
    fn identity_pose_adds_translation() {
        let pose = MarkerPose::new(RotationVector::new(0.0, 0.0, 0.0), Vector3::new(0.1, 0.2, 0.3));
        let tip = tip_position(&pose, PivotOffset::new(0.0, 0.0, 0.05));
        assert_relative_eq!(tip.0.coords, Vector3::new(0.1, 0.2, 0.35), epsilon = 1e-12);
    }

    #[test]
    fn half_turn_flips_offset() {
        let pose = MarkerPose::new(
            RotationVector::new(core::f64::consts::PI, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.5),
        );
        let tip = tip_position(&pose, PivotOffset::new(0.0, 0.1, 0.0));
        assert_relative_eq!(tip.0.coords, Vector3::new(0.0, -0.1, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn projects_through_camera() {
        let tracker = TipTracker::new(CameraIntrinsics {
            focals: Vector2::new(500.0, 500.0),
            principal_point: Point2::new(320.0, 240.0),
            skew: 0.0,
        });
        let kp = tracker.project(CameraPoint::new(0.1, -0.05, 0.5)).unwrap();
        assert_relative_eq!(kp.0, Point2::new(420.0, 190.0), epsilon = 1e-9);
        assert!(tracker.project(CameraPoint::new(0.1, -0.05, -0.5)).is_none());
    }
}
