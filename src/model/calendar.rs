use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Calendar meaning of one schedule time unit, used when exporting a
/// schedule onto real dates.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Millisecond,
    Second,
    #[default]
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Milliseconds per schedule time unit.
    pub fn millis(self) -> i64 {
        match self {
            TimeUnit::Millisecond => 1,
            TimeUnit::Second => 1_000,
            TimeUnit::Minute => 60_000,
            TimeUnit::Hour => 3_600_000,
            TimeUnit::Day => 86_400_000,
        }
    }
}

/// Daily working window with minute precision.
///
/// Out-of-range components are clamped and a reversed window is swapped, so a
/// constructed value always satisfies `start <= end <= 24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkHours {
    start_hour: u32,
    start_minute: u32,
    end_hour: u32,
    end_minute: u32,
}

impl WorkHours {
    pub fn new(start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Self {
        let mut start = (start_hour.min(24), start_minute.min(59));
        let mut end = (end_hour.min(24), end_minute.min(59));
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Self {
            start_hour: start.0,
            start_minute: start.1,
            end_hour: end.0,
            end_minute: end.1,
        }
    }

    /// Working milliseconds per day.
    pub fn work_millis(&self) -> i64 {
        let start = self.start_hour as i64 * 60 + self.start_minute as i64;
        let end = self.end_hour as i64 * 60 + self.end_minute as i64;
        (end - start) * 60_000
    }

    /// Offset of the working start from midnight, in milliseconds.
    pub fn start_offset_millis(&self) -> i64 {
        (self.start_hour as i64 * 60 + self.start_minute as i64) * 60_000
    }
}

impl Default for WorkHours {
    /// Round-the-clock window, for problems without a working calendar.
    fn default() -> Self {
        Self::new(0, 0, 24, 0)
    }
}

impl fmt::Display for WorkHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_hour, self.start_minute, self.end_hour, self.end_minute
        )
    }
}

impl std::str::FromStr for WorkHours {
    type Err = String;

    /// Parses `HH:MM-HH:MM`, e.g. `08:00-24:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn time(part: &str) -> Result<(u32, u32), String> {
            let (h, m) = part
                .split_once(':')
                .ok_or_else(|| format!("invalid time '{part}', expected HH:MM"))?;
            let h = h
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid hour in '{part}'"))?;
            let m = m
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid minute in '{part}'"))?;
            Ok((h, m))
        }
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid work hours '{s}', expected HH:MM-HH:MM"))?;
        let (sh, sm) = time(start.trim())?;
        let (eh, em) = time(end.trim())?;
        Ok(Self::new(sh, sm, eh, em))
    }
}
