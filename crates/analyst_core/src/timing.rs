use std::fmt;
use std::time::Duration;

/// Percent per second below which a run is classified as slow.
pub const SLOW_RATE: f64 = 0.5;
/// Percent per second above which a run is classified as fast.
pub const FAST_RATE: f64 = 2.0;

const MIN_PERCENTAGE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedClass {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedClass {
    pub fn label(self) -> &'static str {
        match self {
            SpeedClass::Slow => "slow",
            SpeedClass::Normal => "normal",
            SpeedClass::Fast => "fast",
        }
    }
}

/// Estimated time remaining, shown as "calculating" until progress starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eta {
    #[default]
    Calculating,
    Remaining(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Calculating => write!(f, "calculating"),
            Eta::Remaining(remaining) => write!(f, "{}", format_duration(*remaining)),
        }
    }
}

/// `elapsed / max(percentage, ε) * (100 - percentage)`, clamped at zero.
pub fn estimate_remaining(elapsed: Duration, percentage: u8) -> Eta {
    if percentage == 0 {
        return Eta::Calculating;
    }
    let pct = f64::from(percentage.min(100)).max(MIN_PERCENTAGE);
    let secs = elapsed.as_secs_f64() * (100.0 - pct) / pct;
    Eta::Remaining(Duration::from_secs_f64(secs.max(0.0)))
}

pub fn classify_speed(elapsed: Duration, percentage: u8) -> SpeedClass {
    let secs = elapsed.as_secs_f64();
    if percentage == 0 || secs <= 0.0 {
        return SpeedClass::Normal;
    }
    let rate = f64::from(percentage) / secs;
    if rate < SLOW_RATE {
        SpeedClass::Slow
    } else if rate > FAST_RATE {
        SpeedClass::Fast
    } else {
        SpeedClass::Normal
    }
}

/// Formats as `1h 05m`, `2m 07s` or `9s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
