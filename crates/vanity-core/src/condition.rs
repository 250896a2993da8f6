//! Seasonal and event gates for time-limited options.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A calendar day without a year, written `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            month: at.month(),
            day: at.day(),
        }
    }
}

impl FromStr for MonthDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (m, d) = s
            .split_once('-')
            .ok_or_else(|| format!("expected MM-DD, got '{}'", s))?;
        let month: u32 = m.parse().map_err(|_| format!("bad month in '{}'", s))?;
        let day: u32 = d.parse().map_err(|_| format!("bad day in '{}'", s))?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(format!("'{}' is not a calendar day", s));
        }
        Ok(Self { month, day })
    }
}

impl TryFrom<String> for MonthDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthDay> for String {
    fn from(value: MonthDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// A named yearly window, inclusive at both ends.
///
/// `start` after `end` wraps across the new year (e.g. `12-01` to `02-28`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub start: MonthDay,
    pub end: MonthDay,
}

impl Season {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let today = MonthDay::of(at);
        if self.start <= self.end {
            self.start <= today && today <= self.end
        } else {
            today >= self.start || today <= self.end
        }
    }
}

/// Everything a condition may be evaluated against.
#[derive(Debug, Clone)]
pub struct ConditionContext<'a> {
    pub now: DateTime<Utc>,
    pub seasons: &'a [Season],
    pub active_events: &'a HashSet<String>,
}

impl ConditionContext<'_> {
    /// A condition holds when it names a season covering `now` or an active
    /// event. Unknown names never hold.
    pub fn holds(&self, condition: &str) -> bool {
        if let Some(season) = self.seasons.iter().find(|s| s.name == condition) {
            return season.contains(self.now);
        }
        self.active_events.contains(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap()
    }

    fn winter() -> Season {
        Season {
            name: "winter".to_string(),
            start: "12-01".parse().unwrap(),
            end: "02-28".parse().unwrap(),
        }
    }

    #[test]
    fn test_wrapping_season() {
        let season = winter();
        assert!(season.contains(at(12, 24)));
        assert!(season.contains(at(1, 15)));
        assert!(season.contains(at(2, 28)));
        assert!(!season.contains(at(3, 1)));
        assert!(!season.contains(at(7, 4)));
    }

    #[test]
    fn test_month_day_parse_errors() {
        assert!("13-01".parse::<MonthDay>().is_err());
        assert!("1201".parse::<MonthDay>().is_err());
        assert_eq!("03-07".parse::<MonthDay>().unwrap().to_string(), "03-07");
    }

    #[test]
    fn test_context_checks_seasons_then_events() {
        let seasons = vec![winter()];
        let mut events = HashSet::new();
        events.insert("anniversary".to_string());

        let ctx = ConditionContext {
            now: at(7, 4),
            seasons: &seasons,
            active_events: &events,
        };

        assert!(!ctx.holds("winter"));
        assert!(ctx.holds("anniversary"));
        assert!(!ctx.holds("halloween"));
    }
}
