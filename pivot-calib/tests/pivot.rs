use approx::assert_relative_eq;
use pivot_calib::{tip_position, PivotError, PivotSolver};
use pointer_core::nalgebra::{Rotation3, Unit, Vector3};
use pointer_core::{CalibrationSample, MarkerPose, PivotOffset};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

const SAMPLES: usize = 20;
const EPSILON: f64 = 1e-6;

const MAX_ANGLE: f64 = 1.2;
const TIP_DISTANCE: f64 = 0.35;

/// Random pointer geometry: offset `p0` in the marker frame and stationary tip `g0`.
fn some_geometry(rng: &mut impl Rng) -> (PivotOffset, Vector3<f64>) {
    let offset = PivotOffset::new(
        rng.gen_range(-0.05..0.05),
        rng.gen_range(-0.15..-0.05),
        rng.gen_range(-0.02..0.02),
    );
    let tip = Vector3::new(
        rng.gen_range(-0.1..0.1),
        rng.gen_range(-0.1..0.1),
        TIP_DISTANCE + rng.gen_range(-0.05..0.05),
    );
    (offset, tip)
}

fn random_rotation(rng: &mut impl Rng) -> Rotation3<f64> {
    let axis = Unit::new_normalize(Vector3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    ));
    Rotation3::from_axis_angle(&axis, rng.gen_range(0.1..MAX_ANGLE))
}

/// Poses that keep the tip at `tip` while rotating about it.
fn pivoting_poses(
    rotations: impl Iterator<Item = Rotation3<f64>>,
    offset: PivotOffset,
    tip: Vector3<f64>,
) -> Vec<MarkerPose> {
    rotations
        .map(|rotation| MarkerPose::from_parts(tip - rotation * offset.0, rotation))
        .collect()
}

#[test]
fn recovers_offset_from_fixed_rotations() {
    let offset = PivotOffset::new(0.012, -0.094, 0.004);
    let tip = Vector3::new(0.03, -0.02, 0.32);
    let rotations = [
        (0.0, 0.0, 0.0),
        (0.5, 0.0, 0.0),
        (0.0, 0.5, 0.0),
        (0.0, 0.0, 0.5),
        (0.4, -0.3, 0.2),
        (-0.3, 0.4, -0.5),
    ]
    .into_iter()
    .map(|(r, p, y)| Rotation3::from_euler_angles(r, p, y));
    let poses = pivoting_poses(rotations, offset, tip);
    let samples: Vec<CalibrationSample> = poses.iter().copied().map(Into::into).collect();

    let calibration = PivotSolver::new().solve(&samples).unwrap();

    assert_relative_eq!(calibration.offset.0, offset.0, epsilon = EPSILON);
    assert_relative_eq!(calibration.pivot.0.coords, tip, epsilon = EPSILON);
    assert!(calibration.rms_residual < EPSILON);
}

#[test]
fn randomized() {
    let mut rng = Pcg64::seed_from_u64(7);
    let successes = (0..200).filter(|_| run_round(&mut rng)).count();
    eprintln!("successes: {}", successes);
    assert!(successes > 190);
}

fn run_round(rng: &mut Pcg64) -> bool {
    let (offset, tip) = some_geometry(rng);
    let rotations: Vec<_> = (0..SAMPLES).map(|_| random_rotation(rng)).collect();
    let poses = pivoting_poses(rotations.into_iter(), offset, tip);
    let samples: Vec<CalibrationSample> = poses.iter().copied().map(Into::into).collect();

    let calibration = match PivotSolver::new().solve(&samples) {
        Ok(calibration) => calibration,
        Err(e) => {
            eprintln!("solve failed: {}", e);
            return false;
        }
    };

    let mut success = true;
    if (calibration.offset.0 - offset.0).norm() > EPSILON {
        eprintln!(
            "failed offset check: {}",
            (calibration.offset.0 - offset.0).norm()
        );
        success = false;
    }
    // Every pose used for calibration must put the tip back on the pivot.
    for pose in &poses {
        let distance = (tip_position(pose, calibration.offset).0.coords - tip).norm();
        if distance > EPSILON {
            eprintln!("failed tip check: {}", distance);
            success = false;
        }
    }
    success
}

#[test]
fn noisy_translations_stay_close() {
    let mut rng = Pcg64::seed_from_u64(11);
    let (offset, tip) = some_geometry(&mut rng);
    let rotations: Vec<_> = (0..SAMPLES).map(|_| random_rotation(&mut rng)).collect();
    let poses = pivoting_poses(rotations.into_iter(), offset, tip);
    let samples: Vec<CalibrationSample> = poses
        .iter()
        .map(|pose| {
            let mut sample = CalibrationSample::from(*pose);
            sample.translation += Vector3::new(
                rng.gen_range(-1e-4..1e-4),
                rng.gen_range(-1e-4..1e-4),
                rng.gen_range(-1e-4..1e-4),
            );
            sample
        })
        .collect();

    let calibration = PivotSolver::new().solve(&samples).unwrap();

    assert!((calibration.offset.0 - offset.0).norm() < 2e-3);
    assert!(calibration.rms_residual > 0.0);
    assert!(calibration.rms_residual < 1e-3);
}

#[test]
fn accepts_the_minimum_number_of_samples() {
    let offset = PivotOffset::new(0.0, -0.1, 0.0);
    let tip = Vector3::new(0.0, 0.0, 0.3);
    let rotations = [(0.0, 0.0, 0.0), (0.6, 0.0, 0.0), (0.0, 0.6, 0.0), (0.0, 0.0, 0.6)]
        .into_iter()
        .map(|(r, p, y)| Rotation3::from_euler_angles(r, p, y));
    let samples: Vec<CalibrationSample> = pivoting_poses(rotations, offset, tip)
        .into_iter()
        .map(Into::into)
        .collect();

    let calibration = PivotSolver::new().solve(&samples).unwrap();
    assert_relative_eq!(calibration.offset.0, offset.0, epsilon = EPSILON);

    assert!(matches!(
        PivotSolver::new().solve(&samples[..3]),
        Err(PivotError::NotEnoughSamples { got: 3, .. })
    ));
}
