use chrono::{Duration, NaiveDate};

/// This is the standard way of converting a date to a log file name in
/// daytally.
pub fn date_to_log_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a duration as `HH:MM:SS` with unbounded hours. A ten-day total
/// shows up as 240 hours instead of wrapping around.
pub fn format_hms(duration: Duration) -> String {
    let seconds = duration.num_milliseconds() / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}
