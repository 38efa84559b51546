use crate::detector::{DetectorStats, Sample};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One `devicemotion` reading as posted by the browser. Axes are `null`
/// when the platform has no `accelerationIncludingGravity` data.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleReading {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub timestamp_ms: Option<u64>,
}

impl SampleReading {
    /// Readings without their own timestamp are stamped with `fallback_ms`.
    pub fn to_sample(&self, fallback_ms: u64) -> Sample {
        Sample {
            x: self.x,
            y: self.y,
            z: self.z,
            timestamp_ms: self.timestamp_ms.unwrap_or(fallback_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MotionBatch {
    pub session: String,
    #[serde(default)]
    pub samples: Vec<SampleReading>,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session: String,
}

/// What the record store needs to persist a visit logged by shaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitDraft {
    pub date: String,
    pub time: String,
    pub annotation: String,
}

impl VisitDraft {
    pub fn at(moment: NaiveDateTime, annotation: &str) -> Self {
        Self {
            date: moment.format("%Y-%m-%d").to_string(),
            time: moment.format("%H:%M").to_string(),
            annotation: annotation.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MotionResponse {
    pub session: String,
    pub events: Vec<VisitDraft>,
    pub stats: DetectorStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub session: String,
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    pub session: String,
    pub stats: DetectorStats,
    pub has_baseline: bool,
    pub shaking: bool,
    pub consecutive: u32,
    pub cooling_down: bool,
    /// Milliseconds since the last batch with samples; `None` means no data yet.
    pub idle_ms: Option<u64>,
}
