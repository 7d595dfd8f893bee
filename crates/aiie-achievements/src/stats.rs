//! 用户累计统计

use crate::streak::StreakData;
use aiie_core::utils::percentage;
use aiie_core::AssessmentResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单个分类的作答统计
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStats {
    pub attempted: u32,
    pub correct: u32,
}

impl CategoryStats {
    /// 正确率（百分比）
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct as usize, self.attempted as usize)
    }
}

/// 成就判定所用的累计统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub cases_completed: u32,
    pub correct_cases: u32,
    pub perfect_scores: u32,
    pub assessments_completed: u32,
    pub assessments_passed: u32,
    pub category_stats: HashMap<String, CategoryStats>,
    /// 答对病例中的最短用时（秒）
    pub fastest_correct_seconds: Option<u64>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl UserStats {
    /// 累加一次考核结果
    pub fn record_result(&mut self, result: &AssessmentResult) {
        self.assessments_completed += 1;
        if result.passed {
            self.assessments_passed += 1;
        }
        if result.is_perfect() {
            self.perfect_scores += 1;
        }

        for case in &result.per_case_results {
            self.cases_completed += 1;
            let category = self.category_stats.entry(case.category.clone()).or_default();
            category.attempted += 1;

            if case.correct {
                self.correct_cases += 1;
                category.correct += 1;
                self.fastest_correct_seconds = Some(
                    self.fastest_correct_seconds
                        .map_or(case.time_spent_seconds, |fastest| {
                            fastest.min(case.time_spent_seconds)
                        }),
                );
            }
        }

        tracing::debug!(
            "Stats updated: {} cases, {} assessments",
            self.cases_completed,
            self.assessments_completed
        );
    }

    /// 同步连续天数
    pub fn sync_streak(&mut self, streak: &StreakData) {
        self.current_streak = streak.current_streak;
        self.longest_streak = streak.longest_streak;
    }

    /// 样本数不少于 `min_cases` 的分类中的最高正确率
    pub fn best_category_accuracy(&self, min_cases: u32) -> Option<u32> {
        self.category_stats
            .values()
            .filter(|stats| stats.attempted >= min_cases)
            .map(CategoryStats::accuracy)
            .max()
    }

    /// 任一分类的最大作答数
    pub fn max_category_attempts(&self) -> u32 {
        self.category_stats
            .values()
            .map(|stats| stats.attempted)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiie_core::CaseResult;

    fn case_result(category: &str, correct: bool, seconds: u64) -> CaseResult {
        CaseResult {
            case_id: format!("{}-{}", category, seconds),
            category: category.to_string(),
            selected_imaging_ids: vec!["mri".to_string()],
            optimal_imaging_ids: vec!["mri".to_string()],
            correct,
            flagged: false,
            time_spent_seconds: seconds,
            appropriateness: Vec::new(),
        }
    }

    fn result(cases: Vec<CaseResult>, passed: bool) -> AssessmentResult {
        let correct_count = cases.iter().filter(|c| c.correct).count();
        AssessmentResult {
            assessment_id: "a".to_string(),
            score: percentage(correct_count, cases.len()),
            correct_count,
            total_cases: cases.len(),
            passed,
            time_used: 100,
            per_case_results: cases,
        }
    }

    #[test]
    fn test_record_result_accumulates() {
        let mut stats = UserStats::default();
        stats.record_result(&result(
            vec![case_result("neuro", true, 40), case_result("msk", false, 10)],
            false,
        ));
        stats.record_result(&result(vec![case_result("neuro", true, 25)], true));

        assert_eq!(stats.cases_completed, 3);
        assert_eq!(stats.correct_cases, 2);
        assert_eq!(stats.assessments_completed, 2);
        assert_eq!(stats.assessments_passed, 1);
        assert_eq!(stats.perfect_scores, 1);
        assert_eq!(stats.fastest_correct_seconds, Some(25));
        assert_eq!(stats.category_stats["neuro"].correct, 2);
        assert_eq!(stats.category_stats["msk"].accuracy(), 0);
    }

    #[test]
    fn test_best_accuracy_respects_sample_size() {
        let mut stats = UserStats::default();
        stats.record_result(&result(
            vec![
                case_result("neuro", true, 30),
                case_result("neuro", true, 31),
                case_result("neuro", false, 32),
                case_result("chest", true, 33),
            ],
            true,
        ));

        assert_eq!(stats.best_category_accuracy(1), Some(100));
        assert_eq!(stats.best_category_accuracy(3), Some(67));
        assert_eq!(stats.best_category_accuracy(4), None);
        assert_eq!(stats.max_category_attempts(), 3);
    }
}
