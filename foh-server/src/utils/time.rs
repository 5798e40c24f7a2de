//! 时间工具函数 — 营业日边界计算
//!
//! 所有日期→时间戳转换统一在服务层完成，
//! repository 层只接收 `i64` Unix millis。
//!
//! 营业日按本地时区的 cutoff 时刻切分：cutoff 之前仍属于
//! "昨天"的营业日 (凌晨打烊场景)。

use chrono::{Local, NaiveDate, NaiveTime, TimeZone};

/// 解析 cutoff 时间字符串 (HH:MM)，失败返回 00:00
pub fn parse_cutoff(cutoff: &str) -> NaiveTime {
    NaiveTime::parse_from_str(cutoff, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse business_day_cutoff '{}': {}, falling back to 00:00",
            cutoff,
            e
        );
        NaiveTime::MIN
    })
}

/// 计算当前营业日起始日期 (本地时区)
///
/// 当前时间 < cutoff → 还在"昨天"的营业日
/// 当前时间 >= cutoff → 当前营业日 = 今天
pub fn current_business_date(cutoff: NaiveTime) -> NaiveDate {
    let now = Local::now();
    if now.time() < cutoff {
        (now - chrono::Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

/// 日期 + cutoff → Unix millis (本地时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
fn date_cutoff_millis(date: NaiveDate, cutoff: NaiveTime) -> i64 {
    let naive = date.and_time(cutoff);
    Local
        .from_local_datetime(&naive)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 营业日的时间戳区间 `[start, end)`
pub fn business_day_bounds(date: NaiveDate, cutoff: NaiveTime) -> (i64, i64) {
    let next = date.succ_opt().unwrap_or(date);
    (
        date_cutoff_millis(date, cutoff),
        date_cutoff_millis(next, cutoff),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cutoff_valid() {
        assert_eq!(
            parse_cutoff("04:30"),
            NaiveTime::from_hms_opt(4, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_cutoff_invalid_falls_back_to_midnight() {
        assert_eq!(parse_cutoff("not-a-time"), NaiveTime::MIN);
    }

    #[test]
    fn test_business_day_bounds_span_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let cutoff = NaiveTime::from_hms_opt(4, 0, 0).unwrap();
        let (start, end) = business_day_bounds(date, cutoff);
        // 一整天 (±1h 容忍 DST 切换)
        let span = end - start;
        assert!(span >= 23 * 3600 * 1000 && span <= 25 * 3600 * 1000);
    }
}
