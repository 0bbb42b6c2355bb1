//! Human-readable countdown formatting
//!
//! The countdown display uses `MM:SS` with whole seconds rounded down.
//! Minutes are zero-padded to two digits but never truncated, so a
//! two-hour countdown renders as `120:00`.

/// Format a remaining duration in milliseconds as `MM:SS`.
///
/// Negative values render as `00:00`.
///
/// # Examples
///
/// ```
/// use soundpad_common::human_time::format_countdown;
///
/// assert_eq!(format_countdown(65_000), "01:05");
/// assert_eq!(format_countdown(59_999), "00:59");
/// assert_eq!(format_countdown(-10), "00:00");
/// ```
pub fn format_countdown(remaining_ms: i64) -> String {
    let total_secs = remaining_ms.max(0) / 1000;
    let minutes = total_secs / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}", minutes, secs)
}

/// Timer status line shown while a countdown is running
pub fn countdown_status(remaining_ms: i64) -> String {
    format!("Timer: {}", format_countdown(remaining_ms))
}

/// Timer status line shown when a countdown reaches zero
pub fn countdown_finished_status() -> String {
    format!("Timer: {} (finished)", format_countdown(0))
}
