use crate::CalibrationSettings;
use log::debug;
use pointer_core::MarkerPose;
use std::time::Duration;

/// The outcome of offering a pose to the [`SampleFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The pose is far enough in time and orientation from the last admitted one.
    Admitted,
    /// Not enough time has passed since the last admitted pose.
    TooSoon,
    /// The orientation has not changed enough since the last admitted pose.
    TooSimilar,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        self == Admission::Admitted
    }
}

/// The last pose admitted into the calibration set and when it was admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastAdmitted {
    pub pose: MarkerPose,
    pub at: Duration,
}

/// Gates which poses enter the pivot calibration set.
///
/// The pivot system is only well conditioned when the admitted orientations differ. Holding the
/// pointer still would otherwise flood the set with near-identical poses, so a pose is admitted
/// only if both a minimum time has passed and the rotation vector moved far enough since the
/// previously admitted pose. The very first pose is always admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFilter {
    minimum_spacing: Duration,
    minimum_rotation_change: f64,
}

impl SampleFilter {
    pub fn new(minimum_spacing: Duration, minimum_rotation_change: f64) -> Self {
        Self {
            minimum_spacing,
            minimum_rotation_change,
        }
    }

    pub fn from_settings(settings: &CalibrationSettings) -> Self {
        Self::new(
            settings.minimum_sample_spacing(),
            settings.minimum_rotation_change,
        )
    }

    /// Checks a candidate pose against the last admitted pose.
    ///
    /// The time gate is checked first, so a candidate that fails both gates reports
    /// [`Admission::TooSoon`].
    pub fn check(
        &self,
        candidate: &MarkerPose,
        last: Option<&LastAdmitted>,
        now: Duration,
    ) -> Admission {
        let last = match last {
            Some(last) => last,
            None => return Admission::Admitted,
        };

        // A clock that runs backwards never satisfies the spacing.
        let elapsed = now.checked_sub(last.at).unwrap_or_default();
        if elapsed <= self.minimum_spacing {
            return Admission::TooSoon;
        }

        let change = candidate.rotation.distance(last.pose.rotation);
        if change <= self.minimum_rotation_change {
            debug!(
                "pose rejected: rotation changed by {:.3}, need more than {:.3}",
                change, self.minimum_rotation_change
            );
            return Admission::TooSimilar;
        }

        Admission::Admitted
    }

    /// Returns whether the candidate pose should be admitted.
    pub fn admit(&self, candidate: &MarkerPose, last: Option<&LastAdmitted>, now: Duration) -> bool {
        self.check(candidate, last, now).is_admitted()
    }
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self::from_settings(&CalibrationSettings::default())
    }
}
