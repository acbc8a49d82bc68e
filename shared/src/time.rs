//! 时间格式化工具 — 前端展示用
//!
//! 记录以 `i64` Unix millis 存储；面向客户端的"已等待时长"和
//! "下单时刻"字符串统一在这里生成。

use chrono::{DateTime, Utc};

use crate::types::Timestamp;

/// 从创建时刻到现在经过的时长，人类可读 (截断，不四舍五入)。
///
/// - < 60 秒: `"45s"`
/// - < 60 分钟: `"2m 5s"`
/// - 其他: `"1h 1m"`
pub fn format_elapsed(created_at: Timestamp, now: Timestamp) -> String {
    let secs = ((now - created_at).max(0)) / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// 时间戳 → `HH:MM:SS` 时钟字符串 (UTC)
pub fn format_clock(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_under_a_minute() {
        assert_eq!(format_elapsed(0, 45_000), "45s");
        assert_eq!(format_elapsed(0, 0), "0s");
        assert_eq!(format_elapsed(0, 59_999), "59s");
    }

    #[test]
    fn elapsed_under_an_hour() {
        assert_eq!(format_elapsed(0, 125_000), "2m 5s");
        assert_eq!(format_elapsed(0, 60_000), "1m 0s");
        assert_eq!(format_elapsed(0, 3_599_000), "59m 59s");
    }

    #[test]
    fn elapsed_hours_truncates_seconds() {
        assert_eq!(format_elapsed(0, 3_700_000), "1h 1m");
        assert_eq!(format_elapsed(0, 3_600_000), "1h 0m");
        assert_eq!(format_elapsed(0, 7_325_000), "2h 2m");
    }

    #[test]
    fn elapsed_never_negative() {
        assert_eq!(format_elapsed(10_000, 5_000), "0s");
    }

    #[test]
    fn clock_formats_utc() {
        // 2024-01-01 00:00:05 UTC
        assert_eq!(format_clock(1_704_067_205_000), "00:00:05");
    }
}
