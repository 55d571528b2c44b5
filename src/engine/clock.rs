//! Clocks for stamping workflow and step events
//!
//! The engine never reads the system time directly. It asks a [`Clock`], so
//! tests (and the CLI's `--at` option) can run workflows against virtual time.
//!
//! # Example
//!
//! ```rust
//! use report_workflows::engine::clock::{parse_duration, parse_time, Clock, MockClock};
//!
//! # tokio_test::block_on(async {
//! let clock = MockClock::at(parse_time("2024-01-15T10:30:00Z").unwrap());
//! clock.forward(parse_duration("1h30m").unwrap()).await;
//! assert_eq!(clock.now().await, parse_time("2024-01-15T12:00:00Z").unwrap());
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Source of timestamps for the engine
#[async_trait]
pub trait Clock: Send + Sync {
    async fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable virtual clock; falls back to real time until set
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    inner: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock frozen at `time`
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(time))),
        }
    }

    /// Check if the clock is using virtual time
    pub async fn is_virtual(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Set the clock to a specific time (enables virtual time)
    pub async fn set(&self, time: DateTime<Utc>) {
        *self.inner.write().await = Some(time);
    }

    /// Advance the clock by a duration
    pub async fn forward(&self, duration: Duration) {
        let mut state = self.inner.write().await;
        let current = state.unwrap_or_else(Utc::now);
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        *state = Some(current.checked_add_signed(step).unwrap_or(current));
    }

    /// Advance the clock to a specific time
    /// Returns error if the target time is before the current time
    pub async fn forward_until(&self, target: DateTime<Utc>) -> Result<(), ClockError> {
        let mut state = self.inner.write().await;
        let current = state.unwrap_or_else(Utc::now);

        if target < current {
            return Err(ClockError::CannotGoBackwards { current, target });
        }

        *state = Some(target);
        Ok(())
    }

    /// Reset the clock to use real time
    pub async fn reset(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl Clock for MockClock {
    async fn now(&self) -> DateTime<Utc> {
        self.inner.read().await.unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("Cannot move clock backwards: current time is {current}, target is {target}")]
    CannotGoBackwards {
        current: DateTime<Utc>,
        target: DateTime<Utc>,
    },

    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Invalid duration format: {0}")]
    InvalidDurationFormat(String),
}

/// Parse a duration string like "1h30m", "500ms", "2d"
pub fn parse_duration(s: &str) -> Result<Duration, ClockError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ClockError::InvalidDurationFormat(
            "empty string".to_string(),
        ));
    }

    let mut total = Duration::ZERO;
    let mut current_num = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            current_num.push(c);
            continue;
        }

        if current_num.is_empty() {
            return Err(ClockError::InvalidDurationFormat(format!(
                "expected number before unit '{}'",
                c
            )));
        }

        let num: f64 = current_num.parse().map_err(|_| {
            ClockError::InvalidDurationFormat(format!("invalid number: {}", current_num))
        })?;
        current_num.clear();

        let millis = match c {
            'd' => num * 24.0 * 60.0 * 60.0 * 1000.0,
            'h' => num * 60.0 * 60.0 * 1000.0,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                num
            }
            'm' => num * 60.0 * 1000.0,
            's' => num * 1000.0,
            _ => {
                return Err(ClockError::InvalidDurationFormat(format!(
                    "unknown unit '{}'",
                    c
                )))
            }
        };

        if millis >= u64::MAX as f64 {
            return Err(ClockError::InvalidDurationFormat(format!("out of range: {}", s)));
        }
        total = total
            .checked_add(Duration::from_millis(millis as u64))
            .ok_or_else(|| ClockError::InvalidDurationFormat(format!("out of range: {}", s)))?;
    }

    // Handle trailing number (assume seconds if no unit)
    if !current_num.is_empty() {
        let num: f64 = current_num.parse().map_err(|_| {
            ClockError::InvalidDurationFormat(format!("invalid number: {}", current_num))
        })?;
        total = Duration::try_from_secs_f64(num)
            .ok()
            .and_then(|trailing| total.checked_add(trailing))
            .ok_or_else(|| ClockError::InvalidDurationFormat(format!("out of range: {}", s)))?;
    }

    Ok(total)
}

/// Parse a time string (ISO 8601 or Unix timestamp in seconds)
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, ClockError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(ClockError::InvalidTimeFormat(format!(
        "could not parse '{}' as ISO 8601 or Unix timestamp",
        s
    )))
}
