//! 病例评判与成绩汇总
//!
//! 将作答与预定义最佳影像集比较，并汇总为百分制成绩

use aiie_core::utils::percentage;
use aiie_core::{
    Assessment, AssessmentCase, AssessmentResult, CaseAnswer, CaseResult, ImagingOption,
    ScoringResult,
};
use aiie_scoring::ScoringEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 病例判定规则
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradingRule {
    /// 已选影像与最佳集合有交集即为正确
    #[default]
    AnyOverlap,
    /// 非空且所有已选影像都在最佳集合内
    NoExtraneous,
    /// 已选集合与最佳集合完全一致
    ExactMatch,
}

impl GradingRule {
    /// 判断单个病例是否正确
    pub fn is_correct(&self, selected: &[String], optimal: &[String]) -> bool {
        if selected.is_empty() {
            return false;
        }

        match self {
            GradingRule::AnyOverlap => selected.iter().any(|id| optimal.contains(id)),
            GradingRule::NoExtraneous => selected.iter().all(|id| optimal.contains(id)),
            GradingRule::ExactMatch => {
                selected.iter().all(|id| optimal.contains(id))
                    && optimal.iter().all(|id| selected.contains(id))
            }
        }
    }
}

impl std::str::FromStr for GradingRule {
    type Err = aiie_core::AiieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_overlap" => Ok(GradingRule::AnyOverlap),
            "no_extraneous" => Ok(GradingRule::NoExtraneous),
            "exact_match" => Ok(GradingRule::ExactMatch),
            other => Err(aiie_core::AiieError::Config(format!(
                "Unknown grading rule: {}",
                other
            ))),
        }
    }
}

/// 评分器
#[derive(Debug, Clone, Default)]
pub struct Grader {
    rule: GradingRule,
    engine: ScoringEngine,
}

impl Grader {
    pub fn new(rule: GradingRule, engine: ScoringEngine) -> Self {
        Self { rule, engine }
    }

    pub fn rule(&self) -> GradingRule {
        self.rule
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// 对整场考核评判，未作答病例计为错误
    pub fn grade(
        &self,
        assessment: &Assessment,
        cases: &[AssessmentCase],
        answers: &HashMap<String, CaseAnswer>,
        imaging_options: &HashMap<String, ImagingOption>,
        time_used: u64,
    ) -> AssessmentResult {
        let per_case_results: Vec<CaseResult> = cases
            .iter()
            .map(|case| self.grade_case(case, answers.get(&case.id), imaging_options))
            .collect();

        let correct_count = per_case_results.iter().filter(|r| r.correct).count();
        let total_cases = cases.len();
        let score = percentage(correct_count, total_cases);

        tracing::info!(
            "Graded assessment {}: {}/{} correct, score {}",
            assessment.id,
            correct_count,
            total_cases,
            score
        );

        AssessmentResult {
            assessment_id: assessment.id.clone(),
            score,
            correct_count,
            total_cases,
            passed: score >= assessment.passing_score,
            time_used,
            per_case_results,
        }
    }

    /// 评判单个病例
    pub fn grade_case(
        &self,
        case: &AssessmentCase,
        answer: Option<&CaseAnswer>,
        imaging_options: &HashMap<String, ImagingOption>,
    ) -> CaseResult {
        let selected = answer
            .map(|a| a.selected_imaging_ids.clone())
            .unwrap_or_default();

        CaseResult {
            case_id: case.id.clone(),
            category: case.category.clone(),
            correct: self.rule.is_correct(&selected, &case.optimal_imaging_ids),
            flagged: answer.map(|a| a.flagged).unwrap_or(false),
            time_spent_seconds: answer.map(|a| a.time_spent_seconds).unwrap_or(0),
            appropriateness: self.score_selection(case, &selected, imaging_options),
            optimal_imaging_ids: case.optimal_imaging_ids.clone(),
            selected_imaging_ids: selected,
        }
    }

    /// 对已选影像计算适宜性得分；病例缺少临床数据或影像选项未知时跳过
    fn score_selection(
        &self,
        case: &AssessmentCase,
        selected: &[String],
        imaging_options: &HashMap<String, ImagingOption>,
    ) -> Vec<ScoringResult> {
        let Some(input) = case.clinical_input.as_ref() else {
            return Vec::new();
        };

        selected
            .iter()
            .filter_map(|id| imaging_options.get(id))
            .map(|option| self.engine.score(input, &option.modality))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiie_core::{ClinicalInput, Difficulty};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn case(id: &str, optimal: &[&str]) -> AssessmentCase {
        AssessmentCase {
            id: id.to_string(),
            title: format!("Case {}", id),
            category: "neuro".to_string(),
            difficulty: Difficulty::Intermediate,
            clinical_input: None,
            optimal_imaging_ids: ids(optimal),
        }
    }

    fn answer(selected: &[&str]) -> CaseAnswer {
        CaseAnswer {
            selected_imaging_ids: ids(selected),
            ..Default::default()
        }
    }

    fn assessment() -> Assessment {
        Assessment {
            id: "neuro-101".to_string(),
            title: "Neuro basics".to_string(),
            time_limit_seconds: 600,
            passing_score: 70,
        }
    }

    #[test]
    fn test_rules_on_partial_and_extra_selections() {
        let optimal = ids(&["mri", "ct"]);

        let partial = ids(&["mri"]);
        assert!(GradingRule::AnyOverlap.is_correct(&partial, &optimal));
        assert!(GradingRule::NoExtraneous.is_correct(&partial, &optimal));
        assert!(!GradingRule::ExactMatch.is_correct(&partial, &optimal));

        let extra = ids(&["mri", "xray"]);
        assert!(GradingRule::AnyOverlap.is_correct(&extra, &optimal));
        assert!(!GradingRule::NoExtraneous.is_correct(&extra, &optimal));
        assert!(!GradingRule::ExactMatch.is_correct(&extra, &optimal));

        let exact = ids(&["ct", "mri"]);
        assert!(GradingRule::ExactMatch.is_correct(&exact, &optimal));

        assert!(!GradingRule::AnyOverlap.is_correct(&[], &optimal));
        assert!(!GradingRule::AnyOverlap.is_correct(&ids(&["xray"]), &optimal));
    }

    #[test]
    fn test_grade_counts_unanswered_as_incorrect() {
        let cases = vec![case("a", &["mri"]), case("b", &["ct"]), case("c", &["us"])];
        let mut answers = HashMap::new();
        answers.insert("a".to_string(), answer(&["mri"]));
        answers.insert("b".to_string(), answer(&["ct", "xray"]));

        let result = Grader::default().grade(&assessment(), &cases, &answers, &HashMap::new(), 120);

        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_cases, 3);
        assert_eq!(result.score, 67);
        assert!(!result.passed);
        assert_eq!(result.time_used, 120);
        assert!(!result.per_case_results[2].correct);
        assert!(result.per_case_results[2].selected_imaging_ids.is_empty());
    }

    #[test]
    fn test_passing_threshold_is_inclusive() {
        let cases = vec![case("a", &["mri"]), case("b", &["ct"])];
        let mut answers = HashMap::new();
        answers.insert("a".to_string(), answer(&["mri"]));

        let mut exam = assessment();
        exam.passing_score = 50;
        let result = Grader::default().grade(&exam, &cases, &answers, &HashMap::new(), 0);

        assert_eq!(result.score, 50);
        assert!(result.passed);
    }

    #[test]
    fn test_selected_imaging_is_scored_when_clinical_input_present() {
        let mut scored_case = case("a", &["ct-head"]);
        scored_case.clinical_input = Some(ClinicalInput {
            neurologic_deficit: true,
            ..Default::default()
        });

        let mut options = HashMap::new();
        options.insert(
            "ct-head".to_string(),
            ImagingOption {
                id: "ct-head".to_string(),
                name: "CT head without contrast".to_string(),
                modality: "CT without contrast".to_string(),
            },
        );

        let grader = Grader::default();
        let result = grader.grade_case(&scored_case, Some(&answer(&["ct-head", "unknown"])), &options);

        assert!(result.correct);
        assert_eq!(result.appropriateness.len(), 1);
        assert_eq!(result.appropriateness[0].final_score, 7.0);
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!("exact_match".parse::<GradingRule>().unwrap(), GradingRule::ExactMatch);
        assert!("partial".parse::<GradingRule>().is_err());
    }
}
