//! CF time units ("hours since 2024-01-15 00:00:00").

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{CommonError, CommonResult};

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            _ => Err(CommonError::InvalidTimeUnits(s.to_string())),
        }
    }
}

/// Parsed `"<unit> since <reference>"` time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn new(unit: TimeUnit, reference: DateTime<Utc>) -> Self {
        Self { unit, reference }
    }

    pub fn parse(s: &str) -> CommonResult<Self> {
        let trimmed = s.trim();
        let (unit, reference) = trimmed
            .split_once(" since ")
            .ok_or_else(|| CommonError::InvalidTimeUnits(s.to_string()))?;
        let unit: TimeUnit = unit
            .trim()
            .parse()
            .map_err(|_| CommonError::InvalidTimeUnits(s.to_string()))?;
        let reference = parse_reference(reference.trim())?;
        Ok(Self { unit, reference })
    }

    /// Calendar time of a numeric offset.
    pub fn to_datetime(&self, offset: f64) -> DateTime<Utc> {
        let millis = (offset * self.unit.seconds() * 1000.0).round() as i64;
        self.reference + Duration::milliseconds(millis)
    }

    /// Numeric offset of a calendar time.
    pub fn to_offset(&self, time: DateTime<Utc>) -> f64 {
        let millis = (time - self.reference).num_milliseconds() as f64;
        millis / 1000.0 / self.unit.seconds()
    }
}

impl fmt::Display for CfTimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} since {}",
            self.unit.as_str(),
            self.reference.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn parse_reference(s: &str) -> CommonResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Trailing "Z" or " UTC" without an offset means UTC.
    let naive = s.trim_end_matches('Z').trim_end_matches(" UTC");
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(CommonError::InvalidTimeReference(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours_since() {
        let units = CfTimeUnits::parse("hours since 2024-01-15 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);
        assert_eq!(
            units.to_datetime(6.0),
            Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_reference_forms() {
        for s in [
            "seconds since 1970-01-01T00:00:00Z",
            "seconds since 1970-01-01 00:00:00",
            "seconds since 1970-01-01",
        ] {
            let units = CfTimeUnits::parse(s).unwrap();
            assert_eq!(units.reference, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
        }
    }

    #[test]
    fn test_offset_inverse() {
        let units = CfTimeUnits::parse("minutes since 2024-03-01").unwrap();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(units.to_offset(t), 90.0);
        assert_eq!(units.to_datetime(90.0), t);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            CfTimeUnits::parse("fortnights since 2024-01-01"),
            Err(CommonError::InvalidTimeUnits(_))
        ));
        assert!(matches!(
            CfTimeUnits::parse("hours since yesterday"),
            Err(CommonError::InvalidTimeReference(_))
        ));
        assert!(CfTimeUnits::parse("hours").is_err());
    }
}
