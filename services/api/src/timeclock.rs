//! Time normalization between the local deployment zone and UTC
//!
//! Events are stored as UTC instants but entered and displayed as local
//! wall-clock times. `LocalClock` owns the single configured IANA zone and
//! performs both conversions, DST-aware.

use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors from time normalization
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    /// The configured zone name is not in the compiled timezone database
    #[error("unrecognized timezone `{0}`")]
    InvalidZone(String),

    /// A wall-clock time that cannot be mapped into the zone
    #[error("invalid local time {0}")]
    InvalidLocalTime(NaiveDateTime),

    /// A raw Unix timestamp outside the representable range
    #[error("invalid unix timestamp {0}")]
    InvalidTimestamp(i64),
}

/// Converter between the configured local zone and UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    /// Create a clock for the given IANA zone name.
    pub fn new(zone: &str) -> Result<Self, TimeError> {
        let tz = zone
            .parse::<Tz>()
            .map_err(|_| TimeError::InvalidZone(zone.to_string()))?;
        Ok(Self { tz })
    }

    /// The current wall-clock date and time in the local zone.
    pub fn now_local(&self) -> (NaiveDate, NaiveTime) {
        let now = Utc::now().with_timezone(&self.tz);
        (now.date_naive(), now.time())
    }

    /// Combine a local date and time of day into a UTC instant.
    ///
    /// A missing time substitutes the current wall-clock time (not
    /// midnight); a missing date substitutes the current date.
    pub fn to_utc(
        &self,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> Result<DateTime<Utc>, TimeError> {
        let (today, now) = self.now_local();
        let local = date.unwrap_or(today).and_time(time.unwrap_or(now));
        self.from_local(local)
    }

    /// Map a local wall-clock datetime to a UTC instant.
    ///
    /// Ambiguous times in the fall-back hour take the earlier instant;
    /// times skipped by the spring-forward gap roll forward one hour.
    pub fn from_local(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
            LocalResult::None => {
                let shifted = local + Duration::hours(1);
                self.tz
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok_or(TimeError::InvalidLocalTime(local))
            }
        }
    }

    /// Convert a stored UTC instant to local date and time for display.
    pub fn to_local(&self, instant: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
        let local = instant.with_timezone(&self.tz);
        (local.date_naive(), local.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn la_clock() -> LocalClock {
        LocalClock::new("America/Los_Angeles").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_invalid_zone() {
        assert_eq!(
            LocalClock::new("Mars/Olympus_Mons"),
            Err(TimeError::InvalidZone("Mars/Olympus_Mons".to_string()))
        );
    }

    #[test]
    fn test_round_trip() {
        let clock = la_clock();
        let (d, t) = (date(2020, 4, 20), time(9, 30));
        let instant = clock.to_utc(Some(d), Some(t)).unwrap();
        assert_eq!(clock.to_local(instant), (d, t));
    }

    #[test]
    fn test_pst_offset() {
        let clock = la_clock();
        // January is PST, UTC-8.
        let instant = clock.to_utc(Some(date(2020, 1, 15)), Some(time(9, 0))).unwrap();
        assert_eq!(instant, "2020-01-15T17:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_pdt_offset() {
        let clock = la_clock();
        // July is PDT, UTC-7.
        let instant = clock.to_utc(Some(date(2020, 7, 15)), Some(time(9, 0))).unwrap();
        assert_eq!(instant, "2020-07-15T16:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_spring_forward_gap_rolls_ahead() {
        let clock = la_clock();
        // 2020-03-08 02:30 does not exist in Los Angeles; it becomes 03:30 PDT.
        let instant = clock.to_utc(Some(date(2020, 3, 8)), Some(time(2, 30))).unwrap();
        assert_eq!(instant, "2020-03-08T10:30:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(clock.to_local(instant), (date(2020, 3, 8), time(3, 30)));
    }

    #[test]
    fn test_fall_back_takes_earlier_instant() {
        let clock = la_clock();
        // 2020-11-01 01:30 occurs twice; the PDT (UTC-7) reading wins.
        let instant = clock.to_utc(Some(date(2020, 11, 1)), Some(time(1, 30))).unwrap();
        assert_eq!(instant, "2020-11-01T08:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_missing_time_uses_current_wall_clock() {
        let clock = la_clock();
        let (_, before) = clock.now_local();
        let instant = clock.to_utc(Some(date(2020, 4, 20)), None).unwrap();
        let (d, t) = clock.to_local(instant);
        let (_, after) = clock.now_local();

        assert_eq!(d, date(2020, 4, 20));
        // The substituted time is the current wall clock, not midnight.
        assert!(t >= before && t <= after || before > after);
    }
}
