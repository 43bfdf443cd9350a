use greeter_core::matcher::{DEFAULT_COSINE_THRESHOLD, DEFAULT_DISTANCE_TOLERANCE};
use greeter_core::{CosineThreshold, DistanceTolerance, FaceComparator, KNOWN_PERSONS_FILENAME};
use std::path::PathBuf;
use std::time::Duration;

/// How face encodings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMetric {
    /// Euclidean distance at or below the tolerance.
    Distance,
    /// Cosine similarity at or above the tolerance.
    Cosine,
}

/// Skill configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the known-persons roster (JSON).
    pub roster_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested camera frame rate; 0 keeps the driver default.
    pub camera_fps: u32,
    /// Capture attempts per greeting before giving up.
    pub capture_attempts: usize,
    /// Pause between capture attempts, in milliseconds.
    pub retry_delay_ms: u64,
    pub match_metric: MatchMetric,
    /// Distance tolerance or similarity threshold, depending on the metric.
    pub match_tolerance: f64,
}

impl Config {
    /// Load configuration from `GREETER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("greeter");

        let roster_path = var("GREETER_ROSTER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(KNOWN_PERSONS_FILENAME));

        let match_metric = match var("GREETER_MATCH_METRIC").as_deref() {
            Some("cosine") => MatchMetric::Cosine,
            Some("distance") | None => MatchMetric::Distance,
            Some(other) => {
                tracing::warn!(metric = other, "unknown GREETER_MATCH_METRIC; using distance");
                MatchMetric::Distance
            }
        };
        let default_tolerance = match match_metric {
            MatchMetric::Distance => DEFAULT_DISTANCE_TOLERANCE,
            MatchMetric::Cosine => DEFAULT_COSINE_THRESHOLD,
        };

        Self {
            roster_path,
            camera_device: var("GREETER_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            camera_fps: parse_or(&var, "GREETER_CAMERA_FPS", 10),
            capture_attempts: parse_or(&var, "GREETER_CAPTURE_ATTEMPTS", 3),
            retry_delay_ms: parse_or(&var, "GREETER_RETRY_DELAY_MS", 100),
            match_metric,
            match_tolerance: parse_or(&var, "GREETER_MATCH_TOLERANCE", default_tolerance),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Comparator for the configured metric and tolerance.
    pub fn comparator(&self) -> Box<dyn FaceComparator> {
        match self.match_metric {
            MatchMetric::Distance => Box::new(DistanceTolerance {
                tolerance: self.match_tolerance,
            }),
            MatchMetric::Cosine => Box::new(CosineThreshold {
                threshold: self.match_tolerance,
            }),
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
