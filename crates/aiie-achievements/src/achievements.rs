//! 成就目录与判定
//!
//! 成就定义是只读的静态目录；已获得的成就只记录 slug，
//! 进度等状态每次按当前统计重新计算。

use crate::stats::UserStats;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// 成就条件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementRequirement {
    CasesCompleted { count: u32 },
    PerfectScores { count: u32 },
    /// 样本数达到 `min_cases` 的分类中最高正确率不低于 `min_accuracy`（百分比）
    CategoryAccuracy { min_accuracy: u32, min_cases: u32 },
    FastCorrectCase { max_seconds: u64 },
    StreakDays { days: u32 },
    AssessmentsPassed { count: u32 },
    AssessmentsCompleted { count: u32 },
}

impl AchievementRequirement {
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match self {
            Self::CasesCompleted { count } => stats.cases_completed >= *count,
            Self::PerfectScores { count } => stats.perfect_scores >= *count,
            Self::CategoryAccuracy {
                min_accuracy,
                min_cases,
            } => stats
                .best_category_accuracy(*min_cases)
                .map(|accuracy| accuracy >= *min_accuracy)
                .unwrap_or(false),
            Self::FastCorrectCase { max_seconds } => stats
                .fastest_correct_seconds
                .map(|seconds| seconds <= *max_seconds)
                .unwrap_or(false),
            Self::StreakDays { days } => stats.current_streak >= *days,
            Self::AssessmentsPassed { count } => stats.assessments_passed >= *count,
            Self::AssessmentsCompleted { count } => stats.assessments_completed >= *count,
        }
    }

    /// 完成进度，范围 0..=1
    pub fn progress(&self, stats: &UserStats) -> f64 {
        if self.is_met(stats) {
            return 1.0;
        }

        let ratio = match self {
            Self::CasesCompleted { count } => fraction(stats.cases_completed, *count),
            Self::PerfectScores { count } => fraction(stats.perfect_scores, *count),
            Self::CategoryAccuracy {
                min_accuracy,
                min_cases,
            } => match stats.best_category_accuracy(*min_cases) {
                Some(accuracy) => fraction(accuracy, *min_accuracy),
                // 样本不足时按样本量计算
                None => fraction(stats.max_category_attempts(), *min_cases),
            },
            Self::FastCorrectCase { .. } => 0.0,
            Self::StreakDays { days } => fraction(stats.current_streak, *days),
            Self::AssessmentsPassed { count } => fraction(stats.assessments_passed, *count),
            Self::AssessmentsCompleted { count } => fraction(stats.assessments_completed, *count),
        };

        ratio.clamp(0.0, 1.0)
    }
}

fn fraction(value: u32, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    f64::from(value) / f64::from(target)
}

/// 成就定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementDefinition {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub requirement: AchievementRequirement,
    pub points: u32,
    /// 隐藏成就在获得前不展示
    #[serde(default)]
    pub secret: bool,
}

impl AchievementDefinition {
    pub fn new(
        slug: &str,
        name: &str,
        description: &str,
        requirement: AchievementRequirement,
        points: u32,
    ) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            requirement,
            points,
            secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// 成就与当前进度
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAchievementStatus {
    pub definition: AchievementDefinition,
    pub earned: bool,
    pub progress: f64,
}

impl UserAchievementStatus {
    pub fn is_visible(&self) -> bool {
        !self.definition.secret || self.earned
    }
}

/// 默认成就目录
pub fn default_catalog() -> Vec<AchievementDefinition> {
    use AchievementRequirement::*;

    vec![
        AchievementDefinition::new(
            "first-case",
            "First Steps",
            "Complete your first case",
            CasesCompleted { count: 1 },
            10,
        ),
        AchievementDefinition::new(
            "cases-10",
            "Getting Started",
            "Complete 10 cases",
            CasesCompleted { count: 10 },
            25,
        ),
        AchievementDefinition::new(
            "cases-50",
            "Case Regular",
            "Complete 50 cases",
            CasesCompleted { count: 50 },
            50,
        ),
        AchievementDefinition::new(
            "cases-100",
            "Centurion",
            "Complete 100 cases",
            CasesCompleted { count: 100 },
            100,
        ),
        AchievementDefinition::new(
            "perfect-score",
            "Flawless",
            "Answer every case of an assessment correctly",
            PerfectScores { count: 1 },
            50,
        ),
        AchievementDefinition::new(
            "category-expert",
            "Category Expert",
            "Reach 90% accuracy in a category with at least 10 cases",
            CategoryAccuracy {
                min_accuracy: 90,
                min_cases: 10,
            },
            75,
        ),
        AchievementDefinition::new(
            "speed-demon",
            "Speed Demon",
            "Answer a case correctly in 30 seconds or less",
            FastCorrectCase { max_seconds: 30 },
            25,
        ),
        AchievementDefinition::new(
            "streak-7",
            "Week Warrior",
            "Study 7 days in a row",
            StreakDays { days: 7 },
            50,
        ),
        AchievementDefinition::new(
            "streak-30",
            "Monthly Master",
            "Study 30 days in a row",
            StreakDays { days: 30 },
            150,
        ),
        AchievementDefinition::new(
            "assessments-passed-5",
            "Certified",
            "Pass 5 assessments",
            AssessmentsPassed { count: 5 },
            50,
        ),
        AchievementDefinition::new(
            "marathon",
            "Marathon",
            "Complete 25 assessments",
            AssessmentsCompleted { count: 25 },
            100,
        )
        .secret(),
    ]
}

/// 成就追踪器
#[derive(Debug, Clone)]
pub struct AchievementTracker {
    catalog: Vec<AchievementDefinition>,
    earned: HashSet<String>,
}

impl Default for AchievementTracker {
    fn default() -> Self {
        Self::new(default_catalog())
    }
}

impl AchievementTracker {
    pub fn new(catalog: Vec<AchievementDefinition>) -> Self {
        Self {
            catalog,
            earned: HashSet::new(),
        }
    }

    /// 恢复已获得的成就
    pub fn with_earned<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.earned.extend(slugs.into_iter().map(Into::into));
        self
    }

    /// 判定并解锁新达成的成就，每个成就只解锁一次
    pub fn check_achievements(&mut self, stats: &UserStats) -> Vec<AchievementDefinition> {
        let unlocked: Vec<AchievementDefinition> = self
            .catalog
            .iter()
            .filter(|def| !self.earned.contains(&def.slug))
            .filter(|def| def.requirement.is_met(stats))
            .cloned()
            .collect();

        for def in &unlocked {
            info!("Achievement unlocked: {} (+{} points)", def.slug, def.points);
            self.earned.insert(def.slug.clone());
        }

        unlocked
    }

    /// 所有成就的当前状态
    pub fn statuses(&self, stats: &UserStats) -> Vec<UserAchievementStatus> {
        self.catalog
            .iter()
            .map(|def| {
                let earned = self.earned.contains(&def.slug);
                UserAchievementStatus {
                    definition: def.clone(),
                    earned,
                    progress: if earned { 1.0 } else { def.requirement.progress(stats) },
                }
            })
            .collect()
    }

    pub fn is_earned(&self, slug: &str) -> bool {
        self.earned.contains(slug)
    }

    pub fn earned_slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.earned.iter().cloned().collect();
        slugs.sort();
        slugs
    }

    pub fn total_points(&self) -> u32 {
        self.catalog
            .iter()
            .filter(|def| self.earned.contains(&def.slug))
            .map(|def| def.points)
            .sum()
    }

    pub fn catalog(&self) -> &[AchievementDefinition] {
        &self.catalog
    }
}
