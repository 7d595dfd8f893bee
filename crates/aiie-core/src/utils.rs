//! 通用工具函数

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 生成考核会话ID
pub fn generate_session_id() -> String {
    format!("session-{}", Uuid::new_v4().simple())
}

/// 四舍五入到一位小数
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 计算百分比并四舍五入为整数，分母为0时返回0
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// 两个时间点之间经过的整秒数，时间倒退时返回0
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    to.signed_duration_since(from).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_generate_session_id() {
        let id = generate_session_id();
        assert!(id.starts_with("session-"));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(7.8), 7.8);
        assert_eq!(round_one_decimal(6.25), 6.3);
        assert_eq!(round_one_decimal(5.04), 5.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_elapsed_seconds() {
        let now = Utc::now();
        assert_eq!(elapsed_seconds(now, now + Duration::seconds(30)), 30);
        assert_eq!(elapsed_seconds(now, now - Duration::seconds(5)), 0);
    }
}
