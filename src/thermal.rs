//! Temperature sources and the monitor that turns samples into overheating decisions

use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::error::ThermalError;

/// Readings at or above this many degrees Celsius count as overheating
pub const DEFAULT_THRESHOLD: f64 = 75.0;

/// Reported in place of a reading when the source fails
pub const FALLBACK_TEMPERATURE: f64 = 40.0;

pub const SYSFS_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Anything that can produce a temperature in degrees Celsius
pub trait TemperatureSource: Send {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError>;
}

impl TemperatureSource for Box<dyn TemperatureSource> {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
        (**self).sample_temperature()
    }
}

/// Always reports the same temperature
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FixedTemperature(pub f64);

impl TemperatureSource for FixedTemperature {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
        Ok(self.0)
    }
}

/// Reads a Linux thermal zone, which reports millidegrees
#[derive(Clone, Debug)]
pub struct SysfsSensor {
    path: PathBuf,
}

impl SysfsSensor {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for SysfsSensor {
    fn default() -> Self {
        Self::new(SYSFS_THERMAL_ZONE)
    }
}

impl TemperatureSource for SysfsSensor {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
        let contents = fs::read_to_string(&self.path)?;
        let trimmed = contents.trim();
        let millidegrees: i64 = trimmed
            .parse()
            .map_err(|_| ThermalError::Parse(trimmed.to_string()))?;
        Ok(millidegrees as f64 / 1000.0)
    }
}

/// A bounded random walk, with an optional heat spike for demonstrations
#[derive(Clone, Debug)]
pub struct SimulatedSensor {
    current: f64,
    rng: StdRng,
    spike_step: Option<u32>,
}

impl SimulatedSensor {
    pub const MIN: f64 = 35.0;
    pub const MAX: f64 = 90.0;
    /// largest change between two calm samples
    pub const DRIFT: f64 = 0.5;
    pub const SPIKE_SAMPLES: u32 = 15;
    pub const SPIKE_HEATING: f64 = 2.0;
    pub const SPIKE_COOLING: f64 = -1.5;

    pub fn new(start: f64, seed: u64) -> Self {
        Self {
            current: start.clamp(Self::MIN, Self::MAX),
            rng: StdRng::seed_from_u64(seed),
            spike_step: None,
        }
    }

    /// Heats up for the next few samples, then cools back down
    pub fn trigger_spike(&mut self) {
        self.spike_step = Some(0);
    }

    pub fn is_spiking(&self) -> bool {
        self.spike_step.is_some()
    }

    fn step(&mut self) -> f64 {
        match self.spike_step {
            Some(step) => {
                self.spike_step = (step + 1 < 2 * Self::SPIKE_SAMPLES).then_some(step + 1);
                if step < Self::SPIKE_SAMPLES {
                    Self::SPIKE_HEATING
                } else {
                    Self::SPIKE_COOLING
                }
            }
            None => self.rng.random_range(-Self::DRIFT..=Self::DRIFT),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(FALLBACK_TEMPERATURE, rand::rng().random())
    }
}

impl TemperatureSource for SimulatedSensor {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
        let delta = self.step();
        self.current = (self.current + delta).clamp(Self::MIN, Self::MAX);
        Ok(self.current)
    }
}

/// Samples another source on a background thread
///
/// Reads never block on the underlying sensor, they return whatever the
/// poller stored last. Until the first sample lands the source is unavailable.
pub struct PolledTemperature {
    latest: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PolledTemperature {
    pub fn spawn<S: TemperatureSource + 'static>(mut source: S, interval: Duration) -> Self {
        let latest = Arc::new(AtomicU64::new(f64::NAN.to_bits()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let latest = latest.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match source.sample_temperature() {
                        Ok(temperature) => latest.store(temperature.to_bits(), Ordering::Relaxed),
                        Err(err) => debug!("background temperature sample failed: {}", err),
                    }
                    thread::park_timeout(interval);
                }
            })
        };

        Self {
            latest,
            stop,
            handle: Some(handle),
        }
    }
}

impl TemperatureSource for PolledTemperature {
    fn sample_temperature(&mut self) -> Result<f64, ThermalError> {
        let temperature = f64::from_bits(self.latest.load(Ordering::Relaxed));
        if temperature.is_nan() {
            Err(ThermalError::Unavailable)
        } else {
            Ok(temperature)
        }
    }
}

impl Drop for PolledTemperature {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ThermalReading {
    pub temperature: f64,
    pub overheating: bool,
    /// the source failed and `temperature` is the fallback value
    pub degraded: bool,
}

/// Compares samples from a [`TemperatureSource`] against a threshold
pub struct ThermalMonitor {
    source: Box<dyn TemperatureSource>,
    threshold: f64,
    cache_ttl: Duration,
    cached: Option<(Instant, ThermalReading)>,
}

impl ThermalMonitor {
    pub fn new<S: TemperatureSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            threshold: DEFAULT_THRESHOLD,
            cache_ttl: Duration::ZERO,
            cached: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Reuse a reading for this long before sampling again
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Samples the source, or returns the cached reading while it is fresh
    ///
    /// A failing source never propagates: the failure is logged and a
    /// degraded, not-overheating reading is returned instead.
    pub fn reading(&mut self) -> ThermalReading {
        if let Some((taken, reading)) = self.cached {
            if taken.elapsed() < self.cache_ttl {
                return reading;
            }
        }

        let reading = match self.source.sample_temperature() {
            Ok(temperature) if temperature.is_finite() => ThermalReading {
                temperature,
                overheating: temperature >= self.threshold,
                degraded: false,
            },
            result => {
                match result {
                    Err(err) => warn!("temperature unavailable, assuming normal: {}", err),
                    Ok(temperature) => {
                        warn!("ignoring temperature reading {}, assuming normal", temperature)
                    }
                }
                ThermalReading {
                    temperature: FALLBACK_TEMPERATURE,
                    overheating: false,
                    degraded: true,
                }
            }
        };

        if !self.cache_ttl.is_zero() {
            self.cached = Some((Instant::now(), reading));
        }
        reading
    }

    pub fn current_temperature(&mut self) -> f64 {
        self.reading().temperature
    }

    pub fn is_overheating(&mut self) -> bool {
        self.reading().overheating
    }
}
