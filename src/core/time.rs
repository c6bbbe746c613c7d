//! Host clock and FILETIME conversions
//!
//! Timestamps in profile records (achievement unlock time, title last played,
//! DateTime settings) are Windows FILETIME values: 100ns ticks since
//! 1601-01-01 UTC.

use chrono::{DateTime, TimeZone, Utc};

/// Ticks between 1601-01-01 and 1970-01-01
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Current host time as a FILETIME
pub fn host_filetime_now() -> u64 {
    datetime_to_filetime(Utc::now())
}

/// Convert a UTC time to FILETIME, clamping times before 1601 to zero
pub fn datetime_to_filetime(time: DateTime<Utc>) -> u64 {
    let ticks = time
        .timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(time.timestamp_subsec_nanos() / 100))
        .saturating_add(UNIX_EPOCH_TICKS);
    ticks.max(0) as u64
}

/// Convert a FILETIME to UTC, `None` when the value is out of chrono's range
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    let ticks = i64::try_from(filetime).ok()? - UNIX_EPOCH_TICKS;
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let epoch = Utc.timestamp_opt(0, 0).single().unwrap();
        assert_eq!(datetime_to_filetime(epoch), UNIX_EPOCH_TICKS as u64);
        assert_eq!(filetime_to_datetime(UNIX_EPOCH_TICKS as u64), Some(epoch));
    }

    #[test]
    fn test_filetime_zero_is_1601() {
        let start = filetime_to_datetime(0).unwrap();
        assert_eq!(start.timestamp(), -UNIX_EPOCH_TICKS / TICKS_PER_SECOND);
    }

    #[test]
    fn test_now_is_after_2020() {
        let y2020 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(host_filetime_now() > datetime_to_filetime(y2020));
    }

    #[test]
    fn test_sub_second_precision() {
        let time = Utc.timestamp_opt(1_700_000_000, 123_456_700).single().unwrap();
        let filetime = datetime_to_filetime(time);
        assert_eq!(filetime_to_datetime(filetime), Some(time));
    }
}
