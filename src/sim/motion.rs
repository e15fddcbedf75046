//! Device motion hand-off
//!
//! Sensors deliver samples on their own thread at their own rate. The latest
//! sample sits behind one small mutex; the tick copies it out once per frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One reading from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Linear acceleration (device frame mapped directly to world)
    pub acceleration: Vec3,
    /// Angular velocity (radians/s)
    pub rotation_rate: Vec3,
}

impl MotionSample {
    pub const ZERO: Self = Self {
        acceleration: Vec3::ZERO,
        rotation_rate: Vec3::ZERO,
    };

    pub fn new(acceleration: Vec3, rotation_rate: Vec3) -> Self {
        Self {
            acceleration,
            rotation_rate,
        }
    }
}

/// Anything that can be polled for a motion reading
pub trait MotionSensor: Send + 'static {
    /// Latest reading, or `None` when nothing new is available
    fn read(&mut self) -> Option<MotionSample>;
}

#[derive(Debug)]
struct Shared {
    latest: Mutex<MotionSample>,
    active: AtomicBool,
}

/// Thread-safe holder of the latest motion sample
///
/// Cloning yields another handle to the same slot, so one clone can live on
/// the sensor thread while the scene keeps the other.
#[derive(Debug, Clone)]
pub struct MotionSource {
    shared: Arc<Shared>,
}

impl Default for MotionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSource {
    /// New source, initially delivering
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                latest: Mutex::new(MotionSample::ZERO),
                active: AtomicBool::new(true),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, MotionSample> {
        self.shared.latest.lock().unwrap_or_else(|poisoned| {
            log::warn!("Motion sample lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Overwrite the latest sample (dropped while stopped)
    pub fn set_sample(&self, sample: MotionSample) {
        if !self.is_active() {
            return;
        }
        *self.slot() = sample;
    }

    /// Copy out the latest sample
    pub fn latest(&self) -> MotionSample {
        if !self.is_active() {
            return MotionSample::ZERO;
        }
        *self.slot()
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Resume accepting samples
    pub fn start(&self) {
        self.shared.active.store(true, Ordering::Release);
    }

    /// Stop accepting samples and fall back to zero
    pub fn stop(&self) {
        self.shared.active.store(false, Ordering::Release);
        *self.slot() = MotionSample::ZERO;
    }

    /// Poll `sensor` on a background thread at `rate_hz`
    pub fn spawn_sampler<S: MotionSensor>(&self, mut sensor: S, rate_hz: f32) -> SamplerHandle {
        let period = Duration::from_secs_f32(1.0 / rate_hz.max(1.0));
        let running = Arc::new(AtomicBool::new(true));
        let source = self.clone();
        let flag = Arc::clone(&running);

        let thread = std::thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                if let Some(sample) = sensor.read() {
                    source.set_sample(sample);
                }
                std::thread::sleep(period);
            }
        });
        log::debug!("Motion sampler started at {:.0} Hz", rate_hz);

        SamplerHandle {
            running,
            thread: Some(thread),
        }
    }
}

/// Owner of a sampler thread; stops and joins it on drop
#[derive(Debug)]
pub struct SamplerHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Motion sampler thread panicked");
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Turns raw acceleration into discrete shake gestures
#[derive(Debug, Clone)]
pub struct ShakeDetector {
    /// Acceleration magnitude that counts as a shake
    pub threshold: f32,
    /// Minimum seconds between two reported shakes
    pub cooldown: f32,
    last_shake: Option<f32>,
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::new(2.5, 1.0)
    }
}

impl ShakeDetector {
    pub fn new(threshold: f32, cooldown: f32) -> Self {
        Self {
            threshold,
            cooldown,
            last_shake: None,
        }
    }

    /// Feed one sample taken at `time` seconds; true when a shake fires
    pub fn observe(&mut self, sample: &MotionSample, time: f32) -> bool {
        if sample.acceleration.length() < self.threshold {
            return false;
        }
        if let Some(last) = self.last_shake {
            if time - last < self.cooldown {
                return false;
            }
        }
        self.last_shake = Some(time);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantSensor(MotionSample);

    impl MotionSensor for ConstantSensor {
        fn read(&mut self) -> Option<MotionSample> {
            Some(self.0)
        }
    }

    #[test]
    fn test_latest_defaults_to_zero() {
        let source = MotionSource::new();
        assert_eq!(source.latest(), MotionSample::ZERO);
    }

    #[test]
    fn test_set_and_read() {
        let source = MotionSource::new();
        let sample = MotionSample::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        source.set_sample(sample);
        assert_eq!(source.latest(), sample);
    }

    #[test]
    fn test_stop_zeroes_and_drops_samples() {
        let source = MotionSource::new();
        source.set_sample(MotionSample::new(Vec3::ONE, Vec3::ONE));
        source.stop();
        assert_eq!(source.latest(), MotionSample::ZERO);

        source.set_sample(MotionSample::new(Vec3::ONE, Vec3::ONE));
        source.start();
        assert_eq!(source.latest(), MotionSample::ZERO);
    }

    #[test]
    fn test_sampler_thread_delivers() {
        let source = MotionSource::new();
        let sample = MotionSample::new(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
        let handle = source.spawn_sampler(ConstantSensor(sample), 200.0);

        let mut seen = false;
        for _ in 0..200 {
            if source.latest() == sample {
                seen = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop();
        assert!(seen);
    }

    #[test]
    fn test_shake_detector_threshold_and_cooldown() {
        let mut detector = ShakeDetector::new(2.0, 1.0);
        let calm = MotionSample::new(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
        let jolt = MotionSample::new(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO);

        assert!(!detector.observe(&calm, 0.0));
        assert!(detector.observe(&jolt, 0.1));
        assert!(!detector.observe(&jolt, 0.5));
        assert!(detector.observe(&jolt, 1.2));
    }
}
