//! Shake gesture detection over a stream of accelerometer samples.
//!
//! The detector is fed one [`Sample`] at a time and answers with at most one
//! [`ShakeEvent`]. All timing decisions are timestamp comparisons against the
//! sample clock, so the detector never schedules anything and can be driven
//! with synthetic timestamps.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Tunable thresholds for [`ShakeDetector`].
///
/// Durations are signed so that a negative value read from a config file is
/// reported as a [`ConfigurationError`] instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Per-axis delta above which a sample counts as movement.
    pub delta_threshold: f64,
    /// Minimum spacing between processed samples.
    pub sample_min_interval_ms: i64,
    /// Qualifying deltas needed in one episode before firing.
    pub required_consecutive_shakes: i64,
    /// Minimum episode length before firing.
    pub min_episode_duration_ms: i64,
    /// Quiet period after firing during which no episode may start.
    pub cooldown_ms: i64,
    /// Time without a qualifying delta after which an episode is abandoned.
    pub idle_reset_ms: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            delta_threshold: 15.0,
            sample_min_interval_ms: 100,
            required_consecutive_shakes: 1,
            min_episode_duration_ms: 0,
            cooldown_ms: 1000,
            idle_reset_ms: 1000,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.delta_threshold.is_finite() || self.delta_threshold < 0.0 {
            return Err(ConfigurationError::InvalidThreshold(self.delta_threshold));
        }

        let durations = [
            ("sampleMinIntervalMs", self.sample_min_interval_ms),
            ("minEpisodeDurationMs", self.min_episode_duration_ms),
            ("cooldownMs", self.cooldown_ms),
            ("idleResetMs", self.idle_reset_ms),
        ];
        for (field, value) in durations {
            if value < 0 {
                return Err(ConfigurationError::NegativeDuration { field, value });
            }
        }

        if self.required_consecutive_shakes < 1 {
            return Err(ConfigurationError::TooFewShakes(
                self.required_consecutive_shakes,
            ));
        }

        Ok(())
    }
}

/// One accelerometer reading. Axes are optional because some platforms
/// deliver motion events without acceleration data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// Monotonic capture time in milliseconds.
    pub timestamp_ms: u64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            timestamp_ms,
        }
    }

    fn axes(&self) -> Result<[f64; 3], DropReason> {
        match (self.x, self.y, self.z) {
            (Some(x), Some(y), Some(z)) => {
                if x.is_finite() && y.is_finite() && z.is_finite() {
                    Ok([x, y, z])
                } else {
                    Err(DropReason::NonFinite)
                }
            }
            _ => Err(DropReason::MissingAxis),
        }
    }
}

/// Why a sample was discarded without touching detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingAxis,
    NonFinite,
    ClockRegression,
}

/// "The user shook the device decisively."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastSample {
    pub axes: [f64; 3],
    pub timestamp_ms: u64,
}

/// Mutable detector state. Owned by exactly one [`ShakeDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectorState {
    pub last: Option<LastSample>,
    pub shaking: bool,
    pub consecutive: u32,
    pub episode_start_ms: u64,
    pub last_qualifying_ms: u64,
    pub cooldown_until_ms: Option<u64>,
}

impl DetectorState {
    fn end_episode(&mut self) {
        self.shaking = false;
        self.consecutive = 0;
    }
}

/// Running counters for callers that want to tell "never fires" apart from
/// "never receives data".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub received: u64,
    pub processed: u64,
    pub throttled: u64,
    pub dropped_missing_axis: u64,
    pub dropped_non_finite: u64,
    pub dropped_clock_regression: u64,
    pub events: u64,
    pub last_sample_ms: Option<u64>,
}

impl DetectorStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_missing_axis + self.dropped_non_finite + self.dropped_clock_regression
    }

    fn record_drop(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::MissingAxis => &mut self.dropped_missing_axis,
            DropReason::NonFinite => &mut self.dropped_non_finite,
            DropReason::ClockRegression => &mut self.dropped_clock_regression,
        };
        *counter = counter.saturating_add(1);
    }
}

// Validated copy of the config in the units the hot path compares against.
#[derive(Debug, Clone, Copy)]
struct Limits {
    threshold: f64,
    interval_ms: u64,
    required: u32,
    min_episode_ms: u64,
    cooldown_ms: u64,
    idle_ms: u64,
}

impl Limits {
    fn from_config(config: &DetectorConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let ms = |value: i64| u64::try_from(value).unwrap_or(0);
        Ok(Self {
            threshold: config.delta_threshold,
            interval_ms: ms(config.sample_min_interval_ms),
            required: u32::try_from(config.required_consecutive_shakes).unwrap_or(u32::MAX),
            min_episode_ms: ms(config.min_episode_duration_ms),
            cooldown_ms: ms(config.cooldown_ms),
            idle_ms: ms(config.idle_reset_ms),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    config: DetectorConfig,
    limits: Limits,
    state: DetectorState,
    stats: DetectorStats,
}

impl ShakeDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigurationError> {
        let limits = Limits::from_config(&config)?;
        Ok(Self {
            config,
            limits,
            state: DetectorState::default(),
            stats: DetectorStats::default(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }

    /// Feeds one reading. Returns `Some(ShakeEvent)` on the sample that
    /// completes a gesture, `None` otherwise.
    pub fn on_sample(&mut self, sample: &Sample) -> Option<ShakeEvent> {
        self.stats.received = self.stats.received.saturating_add(1);

        let axes = match self.accept(sample) {
            Ok(axes) => axes,
            Err(reason) => {
                self.stats.record_drop(reason);
                debug!(?reason, timestamp_ms = sample.timestamp_ms, "dropping motion sample");
                return None;
            }
        };
        let now = sample.timestamp_ms;

        let Some(last) = self.state.last else {
            self.remember(axes, now);
            return None;
        };

        if now - last.timestamp_ms < self.limits.interval_ms {
            self.stats.throttled = self.stats.throttled.saturating_add(1);
            trace!(timestamp_ms = now, "throttled motion sample");
            return None;
        }

        self.expire_cooldown(now);

        let movement = per_axis_delta(&axes, &last.axes);
        let event = if movement > self.limits.threshold {
            self.on_qualifying(now, last.timestamp_ms)
        } else {
            self.on_quiet(now);
            None
        };

        self.remember(axes, now);
        event
    }

    /// Back to "no last sample, not shaking". Diagnostic counters survive.
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
        debug!("shake detector reset");
    }

    fn accept(&self, sample: &Sample) -> Result<[f64; 3], DropReason> {
        let axes = sample.axes()?;
        match self.state.last {
            Some(last) if sample.timestamp_ms < last.timestamp_ms => {
                Err(DropReason::ClockRegression)
            }
            _ => Ok(axes),
        }
    }

    fn remember(&mut self, axes: [f64; 3], now: u64) {
        self.state.last = Some(LastSample {
            axes,
            timestamp_ms: now,
        });
        self.stats.processed = self.stats.processed.saturating_add(1);
        self.stats.last_sample_ms = Some(now);
    }

    fn expire_cooldown(&mut self, now: u64) {
        if matches!(self.state.cooldown_until_ms, Some(until) if now >= until) {
            self.state.cooldown_until_ms = None;
            self.state.end_episode();
        }
    }

    // The delta that qualifies was measured from `baseline_ms`, so that is
    // where a new episode begins, unless the baseline is older than the idle
    // window: a sensor gap must not count towards the episode duration.
    fn on_qualifying(&mut self, now: u64, baseline_ms: u64) -> Option<ShakeEvent> {
        if self.state.cooldown_until_ms.is_some() {
            trace!(timestamp_ms = now, "movement ignored during cooldown");
            return None;
        }

        if self.state.shaking && now - self.state.last_qualifying_ms >= self.limits.idle_ms {
            debug!(timestamp_ms = now, "stale shake episode replaced");
            self.state.end_episode();
        }

        if self.state.shaking {
            self.state.consecutive = self.state.consecutive.saturating_add(1);
        } else {
            self.state.shaking = true;
            self.state.episode_start_ms = if now - baseline_ms >= self.limits.idle_ms {
                now
            } else {
                baseline_ms
            };
            self.state.consecutive = 1;
            trace!(timestamp_ms = now, "shake episode started");
        }
        self.state.last_qualifying_ms = now;

        let elapsed = now - self.state.episode_start_ms;
        if self.state.consecutive < self.limits.required || elapsed < self.limits.min_episode_ms {
            return None;
        }

        debug!(
            timestamp_ms = now,
            consecutive = self.state.consecutive,
            elapsed_ms = elapsed,
            "shake detected"
        );
        self.state.end_episode();
        self.state.cooldown_until_ms = Some(now.saturating_add(self.limits.cooldown_ms));
        self.stats.events = self.stats.events.saturating_add(1);
        Some(ShakeEvent)
    }

    fn on_quiet(&mut self, now: u64) {
        if self.state.shaking && now - self.state.last_qualifying_ms >= self.limits.idle_ms {
            debug!(
                timestamp_ms = now,
                consecutive = self.state.consecutive,
                "shake episode stalled"
            );
            self.state.end_episode();
        }
    }
}

/// Largest absolute single-axis change. Any one dominant axis is enough.
pub fn per_axis_delta(current: &[f64; 3], previous: &[f64; 3]) -> f64 {
    current
        .iter()
        .zip(previous)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
