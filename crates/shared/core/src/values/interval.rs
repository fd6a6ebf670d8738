use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Bar window length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Minute,
    Hour,
    Daily,
}

impl Interval {
    pub fn duration(&self) -> TimeDelta {
        match self {
            Interval::Minute => TimeDelta::minutes(1),
            Interval::Hour => TimeDelta::hours(1),
            Interval::Daily => TimeDelta::days(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "1m",
            Interval::Hour => "1h",
            Interval::Daily => "d",
        }
    }
}
