use crate::{Admission, CalibrationPhase};
use core::fmt;
use std::time::Duration;

/// What the user should be told about the most recent frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Nothing has happened since start or reset.
    Waiting,
    /// The session was just reset.
    ResetComplete,
    /// No marker was found in the frame.
    NoMarker,
    /// The marker has been seen, collection starts when the countdown runs out.
    Countdown { remaining: Duration },
    /// The countdown was cancelled and waits for the marker to leave the view.
    CountdownCancelled,
    /// Poses are being collected.
    Collecting {
        collected: usize,
        quota: usize,
        admission: Admission,
    },
    /// The pivot solve failed and collection restarted.
    CalibrationFailed { reason: String },
    /// The tip is tracked and a start point can be marked.
    Measuring { distance_cm: Option<f64> },
}

impl Status {
    /// The short mode label shown next to the video.
    pub fn mode(&self, phase: CalibrationPhase) -> &'static str {
        match self {
            Status::NoMarker => "---",
            Status::ResetComplete | Status::Waiting => "idle",
            _ => phase.label(),
        }
    }

    /// The distance line, `--- cm` while nothing is being measured.
    pub fn distance_text(&self) -> String {
        match self {
            Status::Measuring {
                distance_cm: Some(distance),
            } => format!("{:.1} cm", distance),
            Status::Measuring { distance_cm: None } => "--- cm".to_owned(),
            Status::Countdown { .. } => "preparing".to_owned(),
            Status::Collecting { admission, .. } => match admission {
                Admission::Admitted => "OK!",
                Admission::TooSimilar => "change the angle",
                Admission::TooSoon => "waiting...",
            }
            .to_owned(),
            Status::ResetComplete | Status::Waiting => "waiting...".to_owned(),
            _ => "---".to_owned(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "show the marker to the camera"),
            Status::ResetComplete => write!(f, "reset complete"),
            Status::NoMarker => write!(f, "no marker"),
            Status::Countdown { remaining } => {
                write!(f, "{:.1} s remaining", remaining.as_secs_f64())
            }
            Status::CountdownCancelled => write!(f, "auto start cancelled, hide the marker to rearm"),
            Status::Collecting {
                collected, quota, ..
            } => write!(f, "samples: {}/{}", collected, quota),
            Status::CalibrationFailed { reason } => {
                write!(f, "calibration failed, collecting again ({})", reason)
            }
            Status::Measuring { distance_cm: None } => {
                write!(f, "press enter to set a start point")
            }
            Status::Measuring { distance_cm: Some(_) } => write!(f, "measuring..."),
        }
    }
}
