use chrono::{DateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    /// Matches the date column of the CSV summaries, e.g. `2024-03-01 12:00:00 +0000 UTC`.
    pub const CSV_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S +0000 UTC";
}

// Time Helper functions

pub fn epoch_sec_to_datetime(epoch_sec: u64) -> Option<DateTime<Utc>> {
    i64::try_from(epoch_sec)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

pub fn epoch_sec_to_utc_string(epoch_sec: u64) -> String {
    match epoch_sec_to_datetime(epoch_sec) {
        Some(dt) => dt.format(TimeUtils::CSV_TIME_FORMAT).to_string(),
        None => epoch_sec.to_string(),
    }
}

pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    format!("{}d {}h", days, hours % 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_date_format() {
        assert_eq!(epoch_sec_to_utc_string(0), "1970-01-01 00:00:00 +0000 UTC");
        assert_eq!(epoch_sec_to_utc_string(86_400 + 3_661), "1970-01-02 01:01:01 +0000 UTC");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59_000), "59s");
        assert_eq!(format_duration(3_600_000 * 26), "1d 2h");
    }
}
