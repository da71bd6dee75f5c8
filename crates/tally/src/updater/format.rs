//! 更新提示中的显示格式

use chrono::DateTime;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// 人类可读的文件大小，例如 `1.5 KB`、`15 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;

    // 去掉多余的小数位: 15.00 -> 15, 1.50 -> 1.5
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[exponent])
}

/// 发布日期显示为 `YYYY-MM-DD`；无法解析时原样返回
pub fn format_release_date(published_at: &str) -> String {
    match DateTime::parse_from_rfc3339(published_at) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => published_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "0 B")]
    #[test_case(512, "512 B")]
    #[test_case(1024, "1 KB")]
    #[test_case(1536, "1.5 KB")]
    #[test_case(15 * 1024 * 1024, "15 MB")]
    #[test_case(1_234_567, "1.18 MB")]
    #[test_case(3 * 1024 * 1024 * 1024, "3 GB")]
    #[test_case(5000 * 1024 * 1024 * 1024, "5000 GB")]
    fn test_format_file_size(bytes: u64, expected: &str) {
        assert_eq!(format_file_size(bytes), expected);
    }

    #[test]
    fn test_format_release_date() {
        assert_eq!(format_release_date("2024-03-05T10:20:30Z"), "2024-03-05");
        assert_eq!(format_release_date("2024-03-05T23:20:30+08:00"), "2024-03-05");
        assert_eq!(format_release_date("next tuesday"), "next tuesday");
    }
}
