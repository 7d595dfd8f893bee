//! # AIIE 成就模块
//!
//! 连续学习天数、用户累计统计以及成就目录的判定。

pub mod achievements;
pub mod stats;
pub mod streak;

pub use achievements::{
    default_catalog, AchievementDefinition, AchievementRequirement, AchievementTracker,
    UserAchievementStatus,
};
pub use stats::{CategoryStats, UserStats};
pub use streak::{StreakData, StreakUpdate, DEFAULT_MAX_FREEZES};
