//! 版本号比较
//!
//! 版本号形如 `v1.2.3`：去掉前导的非数字前缀后按 `.` 切分，
//! 每段解析为整数（无法解析的段视为 0），较短的一方在末尾补 0 再逐段比较。

use std::cmp::Ordering;
use std::fmt;

/// 比较版本号
/// 返回: 1 表示 v1 > v2, -1 表示 v1 < v2, 0 表示相等
pub fn compare_versions(v1: &str, v2: &str) -> i32 {
    match Version::parse(v1).cmp(&Version::parse(v2)) {
        Ordering::Greater => 1,
        Ordering::Less => -1,
        Ordering::Equal => 0,
    }
}

/// `candidate` 是否严格新于 `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) > 0
}

/// 解析后的版本号
///
/// 相等性与排序都按补零后的逐段比较，因此 `1.0 == 1.0.0`
#[derive(Debug, Clone, Default)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// 解析版本字符串，永不失败
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let numeric = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());

        if numeric.is_empty() {
            return Self::default();
        }

        let segments = numeric
            .split('.')
            .map(|s| s.trim().parse::<u64>().unwrap_or(0))
            .collect();

        Self { segments }
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
