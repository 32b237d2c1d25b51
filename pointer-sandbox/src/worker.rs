use crate::source::PoseSource;
use log::{error, info, warn};
use pivot_calib::{CalibrationStateMachine, Command, FrameReport};
use pointer_core::CameraModel;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Commands waiting for the worker. Each slot holds at most one request, so pressing a key twice
/// before the next frame has the same effect as pressing it once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Pending {
    reset: bool,
    cancel: bool,
    mark: bool,
}

impl Pending {
    /// Drains the slots in the order they are applied.
    fn drain(&mut self) -> Vec<Command> {
        let pending = core::mem::take(self);
        [
            (pending.reset, Command::Reset),
            (pending.cancel, Command::CancelCountdown),
            (pending.mark, Command::MarkOrClear),
        ]
        .iter()
        .filter(|&&(requested, _)| requested)
        .map(|&(_, command)| command)
        .collect()
    }
}

#[derive(Debug, Default)]
struct Inner {
    report: Option<FrameReport>,
    version: u64,
    pending: Pending,
    shutdown: bool,
    finished: bool,
}

/// The latest-value handoff between the processing worker and the console.
///
/// The worker publishes one [`FrameReport`] per frame and readers only ever see the newest one.
/// Commands travel the other way through single-slot flags.
#[derive(Debug, Default)]
pub struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests a command to be applied before the next frame.
    pub fn send(&self, command: Command) {
        let mut inner = self.lock();
        match command {
            Command::Reset => inner.pending.reset = true,
            Command::CancelCountdown => inner.pending.cancel = true,
            Command::MarkOrClear => inner.pending.mark = true,
        }
    }

    /// Asks the worker to stop after the current frame.
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
    }

    /// Whether the worker has stopped and will not publish again.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// The latest report, if it is newer than version `seen`.
    pub fn latest_since(&self, seen: u64) -> Option<(u64, FrameReport)> {
        let inner = self.lock();
        if inner.version > seen {
            inner.report.clone().map(|report| (inner.version, report))
        } else {
            None
        }
    }

    fn publish(&self, report: FrameReport) {
        let mut inner = self.lock();
        inner.report = Some(report);
        inner.version += 1;
    }

    /// Returns the commands to apply, or `None` if the worker should stop.
    pub(crate) fn take_commands(&self) -> Option<Vec<Command>> {
        let mut inner = self.lock();
        if inner.shutdown {
            None
        } else {
            Some(inner.pending.drain())
        }
    }

    fn finish(&self) {
        self.lock().finished = true;
    }
}

/// Runs the acquisition and processing loop on its own thread.
///
/// Every iteration applies pending commands, processes one frame and publishes the report, then
/// sleeps for `frame_delay`. The loop ends on shutdown, at the end of the stream or when the
/// source fails for good. The state machine is handed back when the thread is joined.
pub fn spawn<S, C>(
    mut source: S,
    mut machine: CalibrationStateMachine<C>,
    frame_delay: Duration,
    shared: Arc<Shared>,
) -> JoinHandle<CalibrationStateMachine<C>>
where
    S: PoseSource + 'static,
    C: CameraModel + Send + 'static,
{
    thread::spawn(move || {
        while let Some(commands) = shared.take_commands() {
            for command in commands {
                shared.publish(machine.apply(command));
            }

            match source.next_frame() {
                Ok(Some(frame)) => shared.publish(machine.process(&frame)),
                Ok(None) => {
                    info!("pose source exhausted");
                    break;
                }
                Err(e) if e.is_transient() => warn!("skipping frame: {}", e),
                Err(e) => {
                    error!("pose source failed: {}", e);
                    break;
                }
            }

            if !frame_delay.is_zero() {
                thread::sleep(frame_delay);
            }
        }
        info!("worker stopped");
        shared.finish();
        machine
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use pivot_calib::{CalibrationPhase, CalibrationSettings, Frame};
    use pointer_core::nalgebra::Vector3;
    use pointer_core::{MarkerPose, RotationVector};
    use pointer_pinhole::CameraIntrinsics;

    struct Scripted(std::vec::IntoIter<Result<Frame, SourceError>>);

    impl PoseSource for Scripted {
        fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
            self.0.next().transpose()
        }
    }

    fn frame(millis: u64, marker: bool) -> Result<Frame, SourceError> {
        let pose = MarkerPose::new(
            RotationVector::new(0.1, 0.2, 0.3),
            Vector3::new(0.0, 0.0, 0.3),
        );
        Ok(Frame::new(
            Duration::from_millis(millis),
            if marker { Some(pose) } else { None },
        ))
    }

    fn machine() -> CalibrationStateMachine<CameraIntrinsics> {
        CalibrationStateMachine::new(CalibrationSettings::default(), CameraIntrinsics::identity())
    }

    #[test]
    fn commands_collapse_and_apply_in_order() {
        let mut pending = Pending {
            reset: true,
            cancel: true,
            mark: true,
        };
        assert_eq!(
            pending.drain(),
            vec![
                Command::Reset,
                Command::CancelCountdown,
                Command::MarkOrClear
            ]
        );
        assert!(pending.drain().is_empty());

        let shared = Shared::new();
        shared.send(Command::MarkOrClear);
        shared.send(Command::MarkOrClear);
        assert_eq!(shared.take_commands(), Some(vec![Command::MarkOrClear]));
    }

    #[test]
    fn readers_only_see_newer_reports() {
        let shared = Arc::new(Shared::new());
        assert!(shared.latest_since(0).is_none());
        let mut machine = machine();
        shared.publish(machine.process(&Frame::new(Duration::ZERO, None)));
        shared.publish(machine.process(&Frame::new(Duration::from_millis(30), None)));
        let (version, report) = shared.latest_since(0).unwrap();
        assert_eq!(version, 2);
        assert_eq!(report.timestamp, Duration::from_millis(30));
        assert!(shared.latest_since(version).is_none());
        assert!(shared.latest_since(1).is_some());
    }

    #[test]
    fn worker_runs_until_the_stream_ends() {
        let frames = vec![
            frame(0, false),
            Err(SourceError::Decode {
                line: 2,
                reason: "garbage".to_owned(),
            }),
            frame(30, true),
            frame(60, true),
        ];
        let shared = Arc::new(Shared::new());
        let handle = spawn(
            Scripted(frames.into_iter()),
            machine(),
            Duration::ZERO,
            shared.clone(),
        );
        let machine = handle.join().unwrap();
        assert!(shared.is_finished());
        assert_eq!(machine.phase(), CalibrationPhase::AutoCountdown);
        let (version, report) = shared.latest_since(0).unwrap();
        assert_eq!(version, 3);
        assert_eq!(report.timestamp, Duration::from_millis(60));
    }

    #[test]
    fn shutdown_stops_before_the_next_frame() {
        let shared = Arc::new(Shared::new());
        shared.shutdown();
        let handle = spawn(
            Scripted(vec![frame(0, true)].into_iter()),
            machine(),
            Duration::ZERO,
            shared.clone(),
        );
        let machine = handle.join().unwrap();
        assert!(shared.is_finished());
        assert!(shared.latest_since(0).is_none());
        assert_eq!(machine.phase(), CalibrationPhase::Idle);
    }
}
