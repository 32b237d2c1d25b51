use crate::worker::Shared;
use log::{debug, info, warn};
use pivot_calib::{Command, FrameReport};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const HELP: &str = "\
pointer calibration and distance measurement

1. show the marker to the camera, calibration starts after a short countdown
2. keep the tip on one spot and tilt the pointer in many directions
3. once calibrated, press enter to set a start point at the tip
4. move the tip, the distance from the start point is shown
5. press enter again to clear the start point

keys (confirm with enter):
  enter / m   set or clear the start point
  r           reset the calibration
  c           cancel the auto start countdown
  h           show this help
  q           quit";

/// A line entered on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Command(Command),
    Help,
    Quit,
}

impl Key {
    /// Parses one input line. An empty line is the enter key.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "m" => Some(Key::Command(Command::MarkOrClear)),
            "r" => Some(Key::Command(Command::Reset)),
            "c" => Some(Key::Command(Command::CancelCountdown)),
            "h" => Some(Key::Help),
            "q" | "esc" => Some(Key::Quit),
            _ => None,
        }
    }
}

/// Renders the three overlay lines of a report into one console line.
pub fn render(report: &FrameReport) -> String {
    let mut line = format!(
        "[{}] {} | {}",
        report.mode(),
        report.status,
        report.status.distance_text()
    );
    if let Some((x, y)) = report.tip_pixel.map(|tip| tip.pixel()) {
        line.push_str(&format!(" | tip ({}, {}) px", x, y));
    }
    if let Some((x, y)) = report.start_pixel.map(|start| start.pixel()) {
        line.push_str(&format!(" | start ({}, {}) px", x, y));
    }
    line
}

/// The part of a report whose change is worth a new console line.
fn headline(report: &FrameReport) -> (&'static str, String, String) {
    (
        report.mode(),
        report.status.to_string(),
        report.status.distance_text(),
    )
}

/// Forwards keys read from `input` to the worker.
///
/// Only the quit key stops the session. Running out of input leaves the worker alone, so a
/// replay keeps going when stdin is not a terminal.
pub fn forward_input<R: BufRead>(input: R, shared: &Shared) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("console input closed: {}", e);
                return;
            }
        };
        match Key::parse(&line) {
            Some(Key::Command(command)) => shared.send(command),
            Some(Key::Help) => println!("{}", HELP),
            Some(Key::Quit) => {
                shared.shutdown();
                return;
            }
            None => println!("unknown key {:?}, press h for help", line.trim()),
        }
    }
    debug!("end of console input");
}

/// Reads stdin on a detached thread, since reading blocks.
pub fn spawn_input(shared: Arc<Shared>) {
    thread::spawn(move || forward_input(io::stdin().lock(), &shared));
}

/// Prints a line whenever the mode, status or distance changes, until the worker finishes.
///
/// Returns the last report seen.
pub fn present(shared: &Shared, poll: Duration) -> Option<FrameReport> {
    let mut seen = 0;
    let mut last = None;
    let mut shown = None;
    let mut announced = false;
    loop {
        // Read `finished` first so that the final report is not missed.
        let finished = shared.is_finished();
        if let Some((version, report)) = shared.latest_since(seen) {
            seen = version;
            let current = headline(&report);
            if shown.as_ref() != Some(&current) {
                println!("{}", render(&report));
                shown = Some(current);
            }
            match report.offset {
                Some(offset) if !announced => {
                    info!(
                        "tip offset ({:.4}, {:.4}, {:.4}) m, pointer length {:.1} cm",
                        offset.x,
                        offset.y,
                        offset.z,
                        offset.length() * 100.0
                    );
                    announced = true;
                }
                Some(_) => {}
                None => announced = false,
            }
            last = Some(report);
        }
        if finished {
            return last;
        }
        thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;
    use pivot_calib::{CalibrationPhase, CalibrationSettings, CalibrationStateMachine, Frame};
    use pointer_pinhole::CameraIntrinsics;

    #[test]
    fn enter_marks_and_letters_map_to_commands() {
        assert_eq!(Key::parse(""), Some(Key::Command(Command::MarkOrClear)));
        assert_eq!(Key::parse(" M "), Some(Key::Command(Command::MarkOrClear)));
        assert_eq!(Key::parse("r"), Some(Key::Command(Command::Reset)));
        assert_eq!(Key::parse("c"), Some(Key::Command(Command::CancelCountdown)));
        assert_eq!(Key::parse("H"), Some(Key::Help));
        assert_eq!(Key::parse("q"), Some(Key::Quit));
        assert_eq!(Key::parse("x"), None);
    }

    #[test]
    fn end_of_input_keeps_the_session_running() {
        let shared = Shared::new();
        forward_input("r\nh\n".as_bytes(), &shared);
        assert_eq!(shared.take_commands(), Some(vec![Command::Reset]));
        assert!(!shared.is_finished());

        forward_input("m\nq\nr\n".as_bytes(), &shared);
        assert_eq!(shared.take_commands(), None);
    }

    #[test]
    fn render_idle_frame() {
        let mut machine =
            CalibrationStateMachine::new(CalibrationSettings::default(), CameraIntrinsics::identity());
        let report = machine.process(&Frame::new(Duration::ZERO, None));
        assert_eq!(render(&report), "[---] no marker | ---");
    }

    #[test]
    fn present_returns_the_final_report() {
        let shared = Arc::new(Shared::new());
        let handle = crate::worker::spawn(
            SyntheticSource::new(3, Duration::from_millis(100)),
            CalibrationStateMachine::new(CalibrationSettings::default(), CameraIntrinsics::identity()),
            Duration::ZERO,
            shared.clone(),
        );
        let last = present(&shared, Duration::from_millis(1)).unwrap();
        handle.join().unwrap();
        assert_eq!(last.timestamp, Duration::from_millis(99));
        assert_eq!(last.phase, CalibrationPhase::Idle);
    }
}
