//! 连续学习天数
//!
//! 以自然日为单位记录学习活动。同一天多次记录只算一次；
//! 间隔一天以上且没有可用的冻结卡时，连续天数重新计算。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 默认冻结卡上限
pub const DEFAULT_MAX_FREEZES: u32 = 2;

/// 两次发放冻结卡之间至少间隔的天数
pub const FREEZE_AWARD_INTERVAL_DAYS: i64 = 7;

/// 连续天数数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakData {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub active_today: bool,
    pub streak_freezes: u32,
    pub max_freezes: u32,
    /// 上次发放冻结卡的日期
    #[serde(default)]
    pub last_freeze_award: Option<NaiveDate>,
}

impl Default for StreakData {
    fn default() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            active_today: false,
            streak_freezes: 0,
            max_freezes: DEFAULT_MAX_FREEZES,
            last_freeze_award: None,
        }
    }
}

/// 一次记录活动的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    Started,         // 首次活动
    AlreadyRecorded, // 当天已记录
    Extended,        // 连续 +1
    FreezeUsed,      // 消耗冻结卡，连续天数不变
    Reset,           // 中断后重新从 1 开始
}

impl StreakData {
    pub fn new(max_freezes: u32) -> Self {
        Self {
            max_freezes,
            ..Default::default()
        }
    }

    /// 记录 `today` 的学习活动
    pub fn record_activity(&mut self, today: NaiveDate) -> StreakUpdate {
        let update = match self.last_activity_date {
            None => {
                self.current_streak = 1;
                StreakUpdate::Started
            }
            Some(last) => {
                let gap = (today - last).num_days();
                if gap <= 0 {
                    // 同一天，或日期早于上次记录
                    self.active_today = gap == 0 || self.active_today;
                    debug!("Activity already recorded for {}", last);
                    return StreakUpdate::AlreadyRecorded;
                } else if gap == 1 {
                    self.current_streak += 1;
                    StreakUpdate::Extended
                } else if self.streak_freezes > 0 && self.current_streak > 0 {
                    self.streak_freezes -= 1;
                    info!(
                        "Streak freeze used to bridge {} missed day(s), {} left",
                        gap - 1,
                        self.streak_freezes
                    );
                    StreakUpdate::FreezeUsed
                } else {
                    info!("Streak of {} days broken after {} day gap", self.current_streak, gap);
                    self.current_streak = 1;
                    StreakUpdate::Reset
                }
            }
        };

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(today);
        self.active_today = true;
        update
    }

    /// 按当前日期刷新状态，不记录活动
    ///
    /// 连续已中断且无法用冻结卡衔接时清零，返回 `true`。
    pub fn refresh(&mut self, today: NaiveDate) -> bool {
        let Some(last) = self.last_activity_date else {
            self.active_today = false;
            return false;
        };

        let gap = (today - last).num_days();
        self.active_today = gap == 0;

        if gap > 1 && self.streak_freezes == 0 && self.current_streak > 0 {
            info!("Streak of {} days expired on {}", self.current_streak, today);
            self.current_streak = 0;
            return true;
        }
        false
    }

    /// 增加一张冻结卡，已达上限时返回 `false`
    pub fn add_freeze(&mut self) -> bool {
        if self.streak_freezes >= self.max_freezes {
            return false;
        }
        self.streak_freezes += 1;
        true
    }

    /// 每周发放冻结卡
    ///
    /// 距上次发放满一周（或从未发放）时最多发放 `per_week` 张，
    /// 受 `max_freezes` 限制。返回实际发放的张数。
    pub fn award_weekly_freezes(&mut self, today: NaiveDate, per_week: u32) -> u32 {
        if let Some(last) = self.last_freeze_award {
            if (today - last).num_days() < FREEZE_AWARD_INTERVAL_DAYS {
                return 0;
            }
        }

        let awarded = (0..per_week).take_while(|_| self.add_freeze()).count() as u32;
        self.last_freeze_award = Some(today);
        if awarded > 0 {
            info!(
                "Awarded {} streak freeze(s), {} available",
                awarded, self.streak_freezes
            );
        }
        awarded
    }
}
