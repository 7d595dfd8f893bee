//! 环境变量覆盖配置
//!
//! 修改进程环境变量，单独放在一个测试二进制中，避免与其他读取配置的测试并发。

use aiie_admin::ConfigManager;

#[test]
fn test_environment_overrides_nested_field() {
    std::env::set_var("AIIE_STREAK__MAX_FREEZES", "5");
    std::env::set_var("AIIE_ASSESSMENT__DEFAULT_PASSING_SCORE", "85");
    let manager = ConfigManager::load(None);
    std::env::remove_var("AIIE_STREAK__MAX_FREEZES");
    std::env::remove_var("AIIE_ASSESSMENT__DEFAULT_PASSING_SCORE");

    let manager = manager.unwrap();
    let config = manager.config();
    assert_eq!(config.streak.max_freezes, 5);
    assert_eq!(config.assessment.default_passing_score, 85);
    assert_eq!(config.streak.freezes_per_week_awarded, 1);
}
