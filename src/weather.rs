//! Weather kinds and the active-weather window.
//!
//! Only four of the weather kinds can grant mutations; `Sunny` and
//! `Unknown` always evaluate to "nothing to do". The window's remaining
//! time is recomputed against the wall clock on every read path — stored
//! values are treated as stale by definition.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One weather condition as reported by the weather source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    /// No transient condition; nothing mutates.
    Sunny,
    /// Rain: fruit can become wet.
    Rain,
    /// Snow: wet fruit can freeze, dry fruit can chill.
    Snow,
    /// Dawn: fruit can acquire the dawn color family.
    Dawn,
    /// Amber: fruit can acquire the amber color family.
    Amber,
    /// The weather source could not classify the condition.
    Unknown,
}

/// The four weather kinds that can still grant a mutation, in evaluation
/// order.
pub const ACTIVE_WEATHERS: [WeatherKind; 4] = [
    WeatherKind::Rain,
    WeatherKind::Snow,
    WeatherKind::Dawn,
    WeatherKind::Amber,
];

impl WeatherKind {
    /// Returns true if this weather can grant a mutation.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Rain | Self::Snow | Self::Dawn | Self::Amber)
    }

    /// Returns true if this weather belongs to the lunar (dawn/amber)
    /// family.
    #[must_use]
    pub const fn is_lunar(&self) -> bool {
        matches!(self, Self::Dawn | Self::Amber)
    }

    /// Parses a vendor label into a weather kind, tolerating case and
    /// surrounding noise. Unrecognized labels map to `Unknown`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("rain") {
            Self::Rain
        } else if lower.contains("snow") {
            Self::Snow
        } else if lower.contains("dawn") {
            Self::Dawn
        } else if lower.contains("amber") {
            Self::Amber
        } else if lower.contains("sun") || lower.contains("clear") {
            Self::Sunny
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sunny => "sunny",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Dawn => "dawn",
            Self::Amber => "amber",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// What the weather source reports for the current condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// The classified condition.
    pub kind: WeatherKind,

    /// When the condition started, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the condition is expected to end, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_end_at: Option<DateTime<Utc>>,
}

impl WeatherObservation {
    /// Creates an observation with no timing information.
    #[must_use]
    pub const fn bare(kind: WeatherKind) -> Self {
        Self {
            kind,
            started_at: None,
            expected_end_at: None,
        }
    }
}

/// Synchronous provider of the current weather condition.
///
/// Classifying the condition (typically from a rendered surface) is a
/// collaborator concern; the engine only reads the result.
pub trait WeatherSource: Send + Sync {
    /// The current condition. Must not block.
    fn current(&self) -> WeatherObservation;
}

/// The normalized remaining-time window for the active weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherWindow {
    /// The weather this window describes.
    pub weather: WeatherKind,

    /// When the condition started.
    pub started_at: DateTime<Utc>,

    /// When the condition is expected to end.
    pub expected_end_at: DateTime<Utc>,

    /// Full window length in milliseconds.
    pub duration_ms: i64,

    /// Milliseconds left as of the last recompute. Never read from
    /// storage; see [`WeatherWindow::recomputed_at`].
    pub remaining_ms: i64,
}

impl WeatherWindow {
    /// Creates a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidWeatherWindow` if
    /// `started_at >= expected_end_at`.
    pub fn new(
        weather: WeatherKind,
        started_at: DateTime<Utc>,
        expected_end_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if started_at >= expected_end_at {
            return Err(ValidationError::InvalidWeatherWindow {
                started_at,
                expected_end_at,
            });
        }
        let duration_ms = (expected_end_at - started_at).num_milliseconds();
        let mut window = Self {
            weather,
            started_at,
            expected_end_at,
            duration_ms,
            remaining_ms: 0,
        };
        window.remaining_ms = window.remaining_at(Utc::now());
        Ok(window)
    }

    /// Builds a window from an observation, defaulting missing bounds.
    ///
    /// A missing start defaults to `now`; a missing end defaults to
    /// `start + default_duration`.
    #[must_use]
    pub fn from_observation(obs: &WeatherObservation, default_duration: Duration) -> Self {
        let now = Utc::now();
        let started_at = obs.started_at.unwrap_or(now);
        let expected_end_at = obs
            .expected_end_at
            .filter(|end| *end > started_at)
            .unwrap_or(started_at + default_duration);
        let duration_ms = (expected_end_at - started_at).num_milliseconds();
        let mut window = Self {
            weather: obs.kind,
            started_at,
            expected_end_at,
            duration_ms,
            remaining_ms: 0,
        };
        window.remaining_ms = window.remaining_at(now);
        window
    }

    /// Milliseconds remaining at `now`, clamped at zero.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expected_end_at - now).num_milliseconds().max(0)
    }

    /// Returns a copy with `remaining_ms` recomputed at `now`.
    #[must_use]
    pub fn recomputed_at(&self, now: DateTime<Utc>) -> Self {
        Self {
            remaining_ms: self.remaining_at(now),
            ..*self
        }
    }

    /// Returns true if the window has fully elapsed at `now`.
    #[must_use]
    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_kind_active() {
        assert!(WeatherKind::Rain.is_active());
        assert!(WeatherKind::Amber.is_active());
        assert!(!WeatherKind::Sunny.is_active());
        assert!(!WeatherKind::Unknown.is_active());
    }

    #[test]
    fn test_weather_kind_lunar() {
        assert!(WeatherKind::Dawn.is_lunar());
        assert!(WeatherKind::Amber.is_lunar());
        assert!(!WeatherKind::Rain.is_lunar());
        assert!(!WeatherKind::Snow.is_lunar());
    }

    #[test]
    fn test_weather_from_label() {
        assert_eq!(WeatherKind::from_label("Heavy Rain"), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_label("SNOWSTORM"), WeatherKind::Snow);
        assert_eq!(WeatherKind::from_label("dawn event"), WeatherKind::Dawn);
        assert_eq!(WeatherKind::from_label("amber glow"), WeatherKind::Amber);
        assert_eq!(WeatherKind::from_label("Clear skies"), WeatherKind::Sunny);
        assert_eq!(WeatherKind::from_label("???"), WeatherKind::Unknown);
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let now = Utc::now();
        let result = WeatherWindow::new(WeatherKind::Rain, now, now - Duration::minutes(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_window_remaining_clamped_to_zero() {
        let start = Utc::now() - Duration::minutes(10);
        let end = Utc::now() - Duration::minutes(5);
        let window = WeatherWindow {
            weather: WeatherKind::Snow,
            started_at: start,
            expected_end_at: end,
            duration_ms: 300_000,
            remaining_ms: 123_456, // stale on purpose
        };
        assert_eq!(window.remaining_at(Utc::now()), 0);
        assert!(window.has_ended_at(Utc::now()));
    }

    #[test]
    fn test_window_recompute_ignores_stored_remaining() {
        let now = Utc::now();
        let window = WeatherWindow {
            weather: WeatherKind::Dawn,
            started_at: now,
            expected_end_at: now + Duration::minutes(2),
            duration_ms: 120_000,
            remaining_ms: 999_999_999,
        };
        let fresh = window.recomputed_at(now + Duration::minutes(1));
        assert!(fresh.remaining_ms <= 60_000);
        assert!(fresh.remaining_ms > 0);
    }

    #[test]
    fn test_window_from_observation_defaults() {
        let obs = WeatherObservation::bare(WeatherKind::Amber);
        let window = WeatherWindow::from_observation(&obs, Duration::minutes(3));
        assert_eq!(window.weather, WeatherKind::Amber);
        assert_eq!(window.duration_ms, 180_000);
        assert!(window.remaining_ms > 0);
    }

    #[test]
    fn test_window_from_observation_discards_inverted_end() {
        let now = Utc::now();
        let obs = WeatherObservation {
            kind: WeatherKind::Rain,
            started_at: Some(now),
            expected_end_at: Some(now - Duration::minutes(1)),
        };
        let window = WeatherWindow::from_observation(&obs, Duration::minutes(5));
        assert_eq!(window.duration_ms, 300_000);
    }

    #[test]
    fn test_weather_serialization_round_trip() {
        let json = serde_json::to_string(&WeatherKind::Amber).unwrap();
        assert_eq!(json, "\"amber\"");
        let back: WeatherKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WeatherKind::Amber);
    }
}
