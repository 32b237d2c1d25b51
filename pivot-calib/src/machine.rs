use crate::{
    Admission, CalibrationSettings, LastAdmitted, MeasurementSession, PivotCalibration,
    PivotSolver, SampleFilter, Status, TipTracker,
};
use log::{info, warn};
use pointer_core::{
    CalibrationSample, CameraModel, CameraPoint, KeyPoint, MarkerPose, PivotOffset,
};
use std::time::Duration;

/// One frame as delivered by the upstream pose source.
///
/// `marker` is the pose of the first detected marker, or `None` if no marker was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Time since the start of the session.
    pub timestamp: Duration,
    pub marker: Option<MarkerPose>,
}

impl Frame {
    pub fn new(timestamp: Duration, marker: Option<MarkerPose>) -> Self {
        Self { timestamp, marker }
    }
}

/// User commands consumed by the [`CalibrationStateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Return to [`CalibrationPhase::Idle`], discarding all calibration and measurement state.
    Reset,
    /// Set the measurement start point at the current tip, or clear it.
    MarkOrClear,
    /// Abort a running auto start countdown.
    CancelCountdown,
}

/// The phase of the calibration lifecycle without the data attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationPhase {
    Idle,
    AutoCountdown,
    Collecting,
    Ready,
}

impl CalibrationPhase {
    pub fn label(self) -> &'static str {
        match self {
            CalibrationPhase::Idle => "idle",
            CalibrationPhase::AutoCountdown => "auto start",
            CalibrationPhase::Collecting => "calibration",
            CalibrationPhase::Ready => "measurement",
        }
    }
}

/// The calibration lifecycle.
///
/// Every piece of calibration data lives in the variant it belongs to, so the sample set only
/// exists while collecting and the pivot offset only exists once ready.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    /// Waiting for a marker. While `suppressed`, a visible marker does not start the countdown.
    Idle { suppressed: bool },
    /// A marker has been visible continuously since `started_at`.
    AutoCountdown { started_at: Duration },
    /// Collecting diverse poses for the pivot solve.
    Collecting {
        samples: Vec<CalibrationSample>,
        last: Option<LastAdmitted>,
    },
    /// Calibrated and tracking the tip.
    Ready { calibration: PivotCalibration },
}

impl CalibrationState {
    fn idle() -> Self {
        CalibrationState::Idle { suppressed: false }
    }

    fn collecting() -> Self {
        CalibrationState::Collecting {
            samples: Vec::new(),
            last: None,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        match self {
            CalibrationState::Idle { .. } => CalibrationPhase::Idle,
            CalibrationState::AutoCountdown { .. } => CalibrationPhase::AutoCountdown,
            CalibrationState::Collecting { .. } => CalibrationPhase::Collecting,
            CalibrationState::Ready { .. } => CalibrationPhase::Ready,
        }
    }

    pub fn offset(&self) -> Option<PivotOffset> {
        match self {
            CalibrationState::Ready { calibration } => Some(calibration.offset),
            _ => None,
        }
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        match self {
            CalibrationState::Collecting { samples, .. } => samples,
            _ => &[],
        }
    }
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Everything the presentation layer needs to show for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub timestamp: Duration,
    pub phase: CalibrationPhase,
    pub status: Status,
    pub marker_detected: bool,
    pub tip: Option<CameraPoint>,
    pub tip_pixel: Option<KeyPoint>,
    pub start: Option<CameraPoint>,
    pub start_pixel: Option<KeyPoint>,
    pub distance_cm: Option<f64>,
    /// Time left before collection starts, only during the auto start countdown.
    pub countdown_remaining: Option<Duration>,
    pub samples_collected: usize,
    pub sample_quota: usize,
    pub offset: Option<PivotOffset>,
}

impl FrameReport {
    /// The short mode label.
    pub fn mode(&self) -> &'static str {
        self.status.mode(self.phase)
    }
}

/// Drives detect, auto start, collect, solve and measure across frames.
#[derive(Debug, Clone)]
pub struct CalibrationStateMachine<C> {
    settings: CalibrationSettings,
    filter: SampleFilter,
    solver: PivotSolver,
    tracker: TipTracker<C>,
    state: CalibrationState,
    measurement: MeasurementSession,
    current_tip: Option<CameraPoint>,
    marker_detected: bool,
    last_timestamp: Duration,
    status: Status,
}

impl<C> CalibrationStateMachine<C>
where
    C: CameraModel,
{
    pub fn new(mut settings: CalibrationSettings, camera: C) -> Self {
        if settings.sample_quota < PivotSolver::MINIMUM_SAMPLES {
            warn!(
                "sample quota {} is too small, using {}",
                settings.sample_quota,
                PivotSolver::MINIMUM_SAMPLES
            );
            settings.sample_quota = PivotSolver::MINIMUM_SAMPLES;
        }
        Self {
            settings,
            filter: SampleFilter::from_settings(&settings),
            solver: PivotSolver::from_settings(&settings),
            tracker: TipTracker::new(camera),
            state: CalibrationState::default(),
            measurement: MeasurementSession::new(),
            current_tip: None,
            marker_detected: false,
            last_timestamp: Duration::ZERO,
            status: Status::Waiting,
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.state.phase()
    }

    pub fn offset(&self) -> Option<PivotOffset> {
        self.state.offset()
    }

    pub fn measurement(&self) -> &MeasurementSession {
        &self.measurement
    }

    /// The tip computed from the most recent frame, if any.
    pub fn current_tip(&self) -> Option<CameraPoint> {
        self.current_tip
    }

    /// Processes one frame and reports the result.
    pub fn process(&mut self, frame: &Frame) -> FrameReport {
        let now = frame.timestamp;
        self.last_timestamp = now;
        self.marker_detected = frame.marker.is_some();
        self.current_tip = None;
        let state = core::mem::take(&mut self.state);
        let (state, status) = match frame.marker {
            Some(ref pose) => self.with_marker(state, pose, now),
            None => self.without_marker(state),
        };
        self.state = state;
        self.status = status;
        self.report()
    }

    /// Applies a user command. Returns the updated report of the last frame.
    pub fn apply(&mut self, command: Command) -> FrameReport {
        match command {
            Command::Reset => self.reset(),
            Command::MarkOrClear => self.mark_or_clear(),
            Command::CancelCountdown => {
                if let CalibrationState::AutoCountdown { .. } = self.state {
                    info!("auto start countdown cancelled");
                    self.state = CalibrationState::Idle { suppressed: true };
                    self.status = Status::CountdownCancelled;
                }
            }
        }
        self.report()
    }

    /// Returns to idle and forgets the calibration, collected samples and start point.
    pub fn reset(&mut self) {
        info!("calibration reset");
        self.state = CalibrationState::idle();
        self.measurement.clear();
        self.current_tip = None;
        self.status = Status::ResetComplete;
    }

    /// Marks or clears the measurement start point. Only meaningful while tracking a tip.
    pub fn mark_or_clear(&mut self) {
        if self.phase() != CalibrationPhase::Ready || self.current_tip.is_none() {
            return;
        }
        self.measurement.toggle_start(self.current_tip);
        match self.measurement.start() {
            Some(start) => info!(
                "start point set at ({:.4}, {:.4}, {:.4})",
                start.x, start.y, start.z
            ),
            None => info!("start point cleared"),
        }
        self.status = Status::Measuring {
            distance_cm: self
                .current_tip
                .and_then(|tip| self.measurement.distance_cm(tip)),
        };
    }

    fn without_marker(&mut self, state: CalibrationState) -> (CalibrationState, Status) {
        let state = match state {
            CalibrationState::Idle { .. } => CalibrationState::idle(),
            CalibrationState::AutoCountdown { .. } => {
                info!("marker lost, auto start countdown reset");
                CalibrationState::idle()
            }
            state => state,
        };
        (state, Status::NoMarker)
    }

    fn with_marker(
        &mut self,
        state: CalibrationState,
        pose: &MarkerPose,
        now: Duration,
    ) -> (CalibrationState, Status) {
        match state {
            CalibrationState::Idle { suppressed: true } => {
                (CalibrationState::Idle { suppressed: true }, Status::CountdownCancelled)
            }
            CalibrationState::Idle { suppressed: false } => {
                info!("marker detected, auto start countdown begins");
                self.countdown(now, pose, now)
            }
            CalibrationState::AutoCountdown { started_at } => self.countdown(started_at, pose, now),
            CalibrationState::Collecting { samples, last } => self.collect(samples, last, pose, now),
            CalibrationState::Ready { calibration } => self.track(calibration, pose),
        }
    }

    fn countdown(
        &mut self,
        started_at: Duration,
        pose: &MarkerPose,
        now: Duration,
    ) -> (CalibrationState, Status) {
        let elapsed = now.checked_sub(started_at).unwrap_or_default();
        let countdown = self.settings.auto_start_countdown();
        if elapsed < countdown {
            return (
                CalibrationState::AutoCountdown { started_at },
                Status::Countdown {
                    remaining: countdown - elapsed,
                },
            );
        }
        info!("auto start countdown finished, collecting poses");
        self.collect(Vec::new(), None, pose, now)
    }

    fn collect(
        &mut self,
        mut samples: Vec<CalibrationSample>,
        mut last: Option<LastAdmitted>,
        pose: &MarkerPose,
        now: Duration,
    ) -> (CalibrationState, Status) {
        let quota = self.settings.sample_quota;
        let admission = self.filter.check(pose, last.as_ref(), now);
        if admission == Admission::Admitted {
            samples.push(CalibrationSample::from(*pose));
            last = Some(LastAdmitted { pose: *pose, at: now });
            info!("pose admitted ({}/{})", samples.len(), quota);
        }

        if samples.len() < quota {
            let collected = samples.len();
            return (
                CalibrationState::Collecting { samples, last },
                Status::Collecting {
                    collected,
                    quota,
                    admission,
                },
            );
        }

        match self.solver.solve(&samples) {
            Ok(calibration) => {
                info!(
                    "calibration complete, tip offset ({:.4}, {:.4}, {:.4})",
                    calibration.offset.x, calibration.offset.y, calibration.offset.z
                );
                self.track(calibration, pose)
            }
            Err(e) => {
                warn!("calibration failed: {}", e);
                (
                    CalibrationState::collecting(),
                    Status::CalibrationFailed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    fn track(
        &mut self,
        calibration: PivotCalibration,
        pose: &MarkerPose,
    ) -> (CalibrationState, Status) {
        let tip = self.tracker.tip_position(pose, calibration.offset);
        self.current_tip = Some(tip);
        let distance_cm = self.measurement.distance_cm(tip);
        (
            CalibrationState::Ready { calibration },
            Status::Measuring { distance_cm },
        )
    }

    fn report(&self) -> FrameReport {
        let start = self.measurement.start();
        FrameReport {
            timestamp: self.last_timestamp,
            phase: self.phase(),
            status: self.status.clone(),
            marker_detected: self.marker_detected,
            tip: self.current_tip,
            tip_pixel: self.current_tip.and_then(|tip| self.tracker.project(tip)),
            start,
            start_pixel: start.and_then(|start| self.tracker.project(start)),
            distance_cm: self
                .current_tip
                .and_then(|tip| self.measurement.distance_cm(tip)),
            countdown_remaining: match self.state {
                CalibrationState::AutoCountdown { started_at } => Some(
                    self.settings
                        .auto_start_countdown()
                        .saturating_sub(self.last_timestamp.saturating_sub(started_at)),
                ),
                _ => None,
            },
            samples_collected: self.state.samples().len(),
            sample_quota: self.settings.sample_quota,
            offset: self.offset(),
        }
    }
}
