//! Session anomaly detection from the controller's inertial sensor.
//!
//! The controller streams pitch/roll angles with every datagram. The first
//! ten readings are averaged into a neutral baseline; once armed, a
//! rate-limited check compares the latest reading against that baseline and
//! flags large deviations. Score records pick up the flag at parse time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Number of readings averaged into the neutral baseline.
pub const CALIBRATION_SAMPLES: usize = 10;

/// Minimum spacing between two effective checks. Calls inside the window
/// return false without comparing.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Deviation in degrees on either axis that counts as an anomaly.
pub const PITCH_THRESHOLD_DEG: f32 = 15.0;
pub const ROLL_THRESHOLD_DEG: f32 = 15.0;

/// Neutral device orientation, frozen after calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationBaseline {
    pub pitch: f32,
    pub roll: f32,
}

/// Snapshot of the detector for the status display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorStatus {
    pub baseline: Option<CalibrationBaseline>,
    pub samples_collected: usize,
    pub pitch: f32,
    pub roll: f32,
}

#[derive(Debug)]
enum Phase {
    Calibrating { samples: Vec<(f32, f32)> },
    Armed { baseline: CalibrationBaseline },
}

#[derive(Debug)]
pub struct MotionDetector {
    phase: Phase,
    pitch: f32,
    roll: f32,
    last_check: Option<Instant>,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self {
            phase: Phase::Calibrating {
                samples: Vec::with_capacity(CALIBRATION_SAMPLES),
            },
            pitch: 0.0,
            roll: 0.0,
            last_check: None,
        }
    }

    /// Feeds one inertial reading. This runs for every decoded packet, so it
    /// only records state and never performs the deviation comparison.
    pub fn update(&mut self, pitch: f32, roll: f32) {
        self.pitch = pitch;
        self.roll = roll;

        if let Phase::Calibrating { samples } = &mut self.phase {
            samples.push((pitch, roll));
            if samples.len() >= CALIBRATION_SAMPLES {
                let count = samples.len() as f32;
                let baseline = CalibrationBaseline {
                    pitch: samples.iter().map(|s| s.0).sum::<f32>() / count,
                    roll: samples.iter().map(|s| s.1).sum::<f32>() / count,
                };
                info!(
                    "Motion baseline set: pitch={:.1}°, roll={:.1}°",
                    baseline.pitch, baseline.roll
                );
                self.phase = Phase::Armed { baseline };
            }
        }
    }

    /// Compares the current reading against the baseline. At most one
    /// effective comparison per [`CHECK_INTERVAL`]; while calibrating this
    /// always returns false.
    pub fn check_anomaly(&mut self) -> bool {
        self.check_anomaly_at(Instant::now())
    }

    fn check_anomaly_at(&mut self, now: Instant) -> bool {
        let baseline = match &self.phase {
            Phase::Armed { baseline } => *baseline,
            Phase::Calibrating { .. } => return false,
        };

        if let Some(last) = self.last_check {
            if now.duration_since(last) < CHECK_INTERVAL {
                return false;
            }
        }
        self.last_check = Some(now);

        let pitch_change = (self.pitch - baseline.pitch).abs();
        let roll_change = (self.roll - baseline.roll).abs();

        if pitch_change > PITCH_THRESHOLD_DEG || roll_change > ROLL_THRESHOLD_DEG {
            warn!(
                "Motion anomaly: pitch {:.1}° → {:.1}° (Δ{:.1}°), roll {:.1}° → {:.1}° (Δ{:.1}°)",
                baseline.pitch, self.pitch, pitch_change, baseline.roll, self.roll, roll_change
            );
            return true;
        }

        false
    }

    pub fn status(&self) -> DetectorStatus {
        let (baseline, samples_collected) = match &self.phase {
            Phase::Armed { baseline } => (Some(*baseline), CALIBRATION_SAMPLES),
            Phase::Calibrating { samples } => (None, samples.len()),
        };
        DetectorStatus {
            baseline,
            samples_collected,
            pitch: self.pitch,
            roll: self.roll,
        }
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Detector shared between the receiver task and the parsing pipeline.
///
/// The receiver writes on every packet while the watcher task issues check
/// calls from the parsers; the check's read-then-stamp sequence is why this
/// sits behind a mutex. The lock is never held across an await point.
#[derive(Clone, Debug)]
pub struct SharedDetector {
    inner: Arc<Mutex<MotionDetector>>,
}

impl SharedDetector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MotionDetector::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MotionDetector> {
        // A panic while holding the lock leaves the detector state intact,
        // so a poisoned mutex is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn update(&self, pitch: f32, roll: f32) {
        self.lock().update(pitch, roll);
    }

    pub fn check_anomaly(&self) -> bool {
        self.lock().check_anomaly()
    }

    pub fn status(&self) -> DetectorStatus {
        self.lock().status()
    }
}

impl Default for SharedDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated(pitch: f32, roll: f32) -> MotionDetector {
        let mut detector = MotionDetector::new();
        for _ in 0..CALIBRATION_SAMPLES {
            detector.update(pitch, roll);
        }
        detector
    }

    #[test]
    fn baseline_is_mean_of_first_ten_samples() {
        let mut detector = MotionDetector::new();
        for i in 0..CALIBRATION_SAMPLES {
            detector.update(i as f32, 2.0 * i as f32);
        }
        let status = detector.status();
        let baseline = status.baseline.expect("detector should be armed");
        assert!((baseline.pitch - 4.5).abs() < 1e-4);
        assert!((baseline.roll - 9.0).abs() < 1e-4);
    }

    #[test]
    fn no_anomaly_while_calibrating() {
        let mut detector = MotionDetector::new();
        for _ in 0..CALIBRATION_SAMPLES - 1 {
            detector.update(90.0, 90.0);
            assert!(!detector.check_anomaly());
            assert!(detector.status().baseline.is_none());
        }
    }

    #[test]
    fn large_deviation_is_flagged() {
        let mut detector = calibrated(0.0, 0.0);
        detector.update(PITCH_THRESHOLD_DEG + 1.0, 0.0);
        assert!(detector.check_anomaly());
    }

    #[test]
    fn deviation_at_threshold_is_not_flagged() {
        let mut detector = calibrated(0.0, 0.0);
        detector.update(PITCH_THRESHOLD_DEG, ROLL_THRESHOLD_DEG);
        assert!(!detector.check_anomaly());
    }

    #[test]
    fn second_check_inside_window_returns_false() {
        let mut detector = calibrated(0.0, 0.0);
        detector.update(40.0, 40.0);

        let start = Instant::now();
        assert!(detector.check_anomaly_at(start));
        // Deviation is still present, but the window has not elapsed.
        assert!(!detector.check_anomaly_at(start + Duration::from_millis(500)));
        assert!(detector.check_anomaly_at(start + CHECK_INTERVAL));
    }

    #[test]
    fn rate_limited_check_does_not_consume_the_window() {
        let mut detector = calibrated(0.0, 0.0);
        detector.update(40.0, 40.0);

        let start = Instant::now();
        assert!(detector.check_anomaly_at(start));
        // Repeated early calls must not push the window further out.
        assert!(!detector.check_anomaly_at(start + Duration::from_millis(1900)));
        assert!(detector.check_anomaly_at(start + Duration::from_millis(2100)));
    }
}
