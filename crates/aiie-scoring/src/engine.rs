//! 临床适宜性评分引擎 (AIIE)
//!
//! 将临床表现和候选检查方式转换为 1-9 分的适宜性得分，并给出可解释的因子列表。
//! 评分是纯函数：相同输入总是得到相同输出。

use crate::modality::ModalityCatalog;
use aiie_core::utils::round_one_decimal;
use aiie_core::{
    AppropriatenessCategory, ClinicalInput, ScoringResult, Severity, ShapFactor, SymptomDuration,
};

/// 得分下限
pub const MIN_SCORE: f64 = 1.0;
/// 得分上限
pub const MAX_SCORE: f64 = 9.0;

const RED_FLAG_WEIGHT: f64 = 0.5;
const RED_FLAG_CAP: f64 = 2.0;
const NEUROLOGIC_DEFICIT_WEIGHT: f64 = 2.0;
const CANCER_HISTORY_WEIGHT: f64 = 1.5;
const ACUTE_ONSET_WEIGHT: f64 = 0.8;
const CHRONIC_DURATION_WEIGHT: f64 = -0.5;
const STABLE_PRIOR_IMAGING_WEIGHT: f64 = -1.0;
const AGE_EXTREME_WEIGHT: f64 = 0.5;
const PROGRESSION_WEIGHT: f64 = 1.0;
const RECENT_TRAUMA_WEIGHT: f64 = 1.2;
const IMMUNOCOMPROMISED_WEIGHT: f64 = 1.0;
const SEVERE_WEIGHT: f64 = 0.5;
const MILD_CHRONIC_WEIGHT: f64 = -0.5;

const PEDIATRIC_AGE_LIMIT: u32 = 18;
const GERIATRIC_AGE_LIMIT: u32 = 65;

/// 评分调整规则，按声明顺序依次评估
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    RedFlags,
    NeurologicDeficit,
    CancerHistory,
    SymptomDuration,
    StablePriorImaging,
    AgeExtreme,
    ProgressionOnPriorImaging,
    RecentTrauma,
    Immunocompromised,
    Severity,
}

impl Adjustment {
    /// 固定的评估顺序
    pub const ORDER: [Adjustment; 10] = [
        Adjustment::RedFlags,
        Adjustment::NeurologicDeficit,
        Adjustment::CancerHistory,
        Adjustment::SymptomDuration,
        Adjustment::StablePriorImaging,
        Adjustment::AgeExtreme,
        Adjustment::ProgressionOnPriorImaging,
        Adjustment::RecentTrauma,
        Adjustment::Immunocompromised,
        Adjustment::Severity,
    ];

    /// 评估单个调整，不适用时返回 None
    pub fn evaluate(&self, input: &ClinicalInput) -> Option<ShapFactor> {
        match self {
            Adjustment::RedFlags => {
                if input.red_flags.is_empty() {
                    return None;
                }
                let contribution =
                    (input.red_flags.len() as f64 * RED_FLAG_WEIGHT).min(RED_FLAG_CAP);
                Some(factor(
                    "Red flags",
                    contribution,
                    input.red_flags.join(", "),
                    "Red-flag findings raise the pretest probability of serious pathology",
                    "ACR Appropriateness Criteria: red-flag symptoms",
                ))
            }
            Adjustment::NeurologicDeficit => input.neurologic_deficit.then(|| {
                factor(
                    "Neurologic deficit",
                    NEUROLOGIC_DEFICIT_WEIGHT,
                    "present".to_string(),
                    "Focal or progressive neurologic deficit warrants prompt imaging",
                    "ACR Appropriateness Criteria: neurologic deficit",
                )
            }),
            Adjustment::CancerHistory => input.cancer_history.then(|| {
                factor(
                    "Cancer history",
                    CANCER_HISTORY_WEIGHT,
                    "present".to_string(),
                    "Prior malignancy increases the likelihood of metastatic disease",
                    "ACR Appropriateness Criteria: history of malignancy",
                )
            }),
            Adjustment::SymptomDuration => match input.duration {
                SymptomDuration::Acute => Some(factor(
                    "Acute onset",
                    ACUTE_ONSET_WEIGHT,
                    "acute".to_string(),
                    "Acute presentations are more likely to need time-sensitive diagnosis",
                    "ACR Appropriateness Criteria: acute presentation",
                )),
                SymptomDuration::Chronic => Some(factor(
                    "Chronic duration",
                    CHRONIC_DURATION_WEIGHT,
                    "chronic".to_string(),
                    "Long-standing symptoms without change rarely benefit from urgent imaging",
                    "ACR Appropriateness Criteria: chronic presentation",
                )),
                SymptomDuration::Subacute => None,
            },
            Adjustment::StablePriorImaging => {
                (input.has_prior_imaging() && !input.progressive_symptoms).then(|| {
                    factor(
                        "Stable prior imaging",
                        STABLE_PRIOR_IMAGING_WEIGHT,
                        input.prior_imaging.join(", "),
                        "Repeat imaging without clinical change has low diagnostic yield",
                        "Choosing Wisely: avoid repeat imaging without new findings",
                    )
                })
            }
            Adjustment::AgeExtreme => {
                let age = input.age?;
                (age < PEDIATRIC_AGE_LIMIT || age > GERIATRIC_AGE_LIMIT).then(|| {
                    factor(
                        "Age",
                        AGE_EXTREME_WEIGHT,
                        age.to_string(),
                        "Pediatric and older patients carry higher risk of occult pathology",
                        "ACR Appropriateness Criteria: special populations",
                    )
                })
            }
            Adjustment::ProgressionOnPriorImaging => {
                (input.progressive_symptoms && input.has_prior_imaging()).then(|| {
                    factor(
                        "Progressive symptoms",
                        PROGRESSION_WEIGHT,
                        "progressive".to_string(),
                        "Clinical progression since prior imaging justifies re-evaluation",
                        "ACR Appropriateness Criteria: interval change",
                    )
                })
            }
            Adjustment::RecentTrauma => input.recent_trauma.then(|| {
                factor(
                    "Recent trauma",
                    RECENT_TRAUMA_WEIGHT,
                    "present".to_string(),
                    "Recent trauma raises concern for fracture or hemorrhage",
                    "ACR Appropriateness Criteria: trauma",
                )
            }),
            Adjustment::Immunocompromised => input.immunocompromised.then(|| {
                factor(
                    "Immunocompromised",
                    IMMUNOCOMPROMISED_WEIGHT,
                    "present".to_string(),
                    "Immunosuppression increases the risk of infection and atypical disease",
                    "ACR Appropriateness Criteria: immunocompromised host",
                )
            }),
            Adjustment::Severity => match (input.severity, input.duration) {
                (Severity::Severe, _) => Some(factor(
                    "Severe symptoms",
                    SEVERE_WEIGHT,
                    "severe".to_string(),
                    "Severe symptoms lower the threshold for imaging",
                    "ACR Appropriateness Criteria: symptom severity",
                )),
                (Severity::Mild, SymptomDuration::Chronic) => Some(factor(
                    "Mild chronic symptoms",
                    MILD_CHRONIC_WEIGHT,
                    "mild".to_string(),
                    "Mild long-standing symptoms are usually managed conservatively",
                    "ACR Appropriateness Criteria: symptom severity",
                )),
                _ => None,
            },
        }
    }
}

fn factor(
    name: &str,
    contribution: f64,
    value: String,
    explanation: &str,
    citation: &str,
) -> ShapFactor {
    ShapFactor {
        name: name.to_string(),
        contribution,
        value,
        explanation: explanation.to_string(),
        citation: citation.to_string(),
    }
}

/// 将得分限制在 [1, 9]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// 评分引擎
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    catalog: ModalityCatalog,
}

impl ScoringEngine {
    /// 使用标准检查方式目录创建评分引擎
    pub fn new() -> Self {
        Self {
            catalog: ModalityCatalog::standard(),
        }
    }

    /// 使用自定义目录创建评分引擎
    pub fn with_catalog(catalog: ModalityCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ModalityCatalog {
        &self.catalog
    }

    /// 计算单个检查方式的适宜性得分
    pub fn score(&self, input: &ClinicalInput, modality: &str) -> ScoringResult {
        let baseline = self.catalog.lookup(modality);

        let factors: Vec<ShapFactor> = Adjustment::ORDER
            .iter()
            .filter_map(|adjustment| adjustment.evaluate(input))
            .collect();

        let raw = baseline.base_score + factors.iter().map(|f| f.contribution).sum::<f64>();
        let final_score = clamp_score(round_one_decimal(raw));
        let category = AppropriatenessCategory::from_score(final_score);

        let alternative = match category {
            AppropriatenessCategory::Inappropriate => baseline.alternative.clone(),
            _ => None,
        };

        ScoringResult {
            modality: modality.to_string(),
            final_score,
            category,
            factors,
            radiation: baseline.radiation,
            cost_estimate: baseline.cost_estimate,
            alternative,
        }
    }

    /// 临床数据缺失时回退到基线得分
    pub fn score_optional(&self, input: Option<&ClinicalInput>, modality: &str) -> ScoringResult {
        match input {
            Some(input) => self.score(input, modality),
            None => {
                tracing::debug!("No clinical input for '{}', scoring baseline only", modality);
                self.score(&ClinicalInput::default(), modality)
            }
        }
    }

    /// 对候选检查方式评分并按得分降序排列（稳定排序，同分保持输入顺序）
    pub fn rank<S: AsRef<str>>(&self, input: &ClinicalInput, candidates: &[S]) -> Vec<ScoringResult> {
        let mut results: Vec<ScoringResult> = candidates
            .iter()
            .map(|modality| self.score(input, modality.as_ref()))
            .collect();

        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// 对目录中所有检查方式排序
    pub fn rank_catalog(&self, input: &ClinicalInput) -> Vec<ScoringResult> {
        let names = self.catalog.modality_names();
        self.rank(input, names.as_slice())
    }
}

/// 使用标准目录评分
pub fn score(input: &ClinicalInput, modality: &str) -> ScoringResult {
    ScoringEngine::new().score(input, modality)
}

/// 使用标准目录排序
pub fn rank<S: AsRef<str>>(input: &ClinicalInput, candidates: &[S]) -> Vec<ScoringResult> {
    ScoringEngine::new().rank(input, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mild_subacute() -> ClinicalInput {
        ClinicalInput {
            age: Some(45),
            chief_complaint: "low back pain".to_string(),
            duration: SymptomDuration::Subacute,
            severity: Severity::Mild,
            ..Default::default()
        }
    }

    fn factor_names(result: &ScoringResult) -> Vec<&str> {
        result.factors.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_baseline_only() {
        let result = score(&mild_subacute(), "CT without contrast");

        assert_eq!(result.final_score, 5.0);
        assert_eq!(result.category, AppropriatenessCategory::Uncertain);
        assert!(result.factors.is_empty());
        assert!(result.alternative.is_none());
    }

    #[test]
    fn test_neurologic_deficit_and_acute_onset() {
        let input = ClinicalInput {
            neurologic_deficit: true,
            duration: SymptomDuration::Acute,
            ..mild_subacute()
        };
        let result = score(&input, "CT without contrast");

        assert_eq!(result.final_score, 7.8);
        assert_eq!(result.category, AppropriatenessCategory::Appropriate);
        assert_eq!(factor_names(&result), vec!["Neurologic deficit", "Acute onset"]);
        assert_eq!(result.factors[0].contribution, 2.0);
        assert_eq!(result.factors[1].contribution, 0.8);
    }

    #[test]
    fn test_red_flags_are_capped() {
        let mut input = mild_subacute();
        input.red_flags = vec!["fever".to_string()];
        assert_eq!(score(&input, "CT without contrast").factors[0].contribution, 0.5);

        input.red_flags = (0..6).map(|i| format!("flag-{}", i)).collect();
        let result = score(&input, "CT without contrast");
        assert_eq!(result.factors[0].contribution, 2.0);
        assert_eq!(result.final_score, 7.0);
    }

    #[test]
    fn test_prior_imaging_factors_evaluated_independently() {
        let input = ClinicalInput {
            prior_imaging: vec!["MRI 2023".to_string()],
            progressive_symptoms: true,
            ..mild_subacute()
        };
        let result = score(&input, "MRI without contrast");
        assert_eq!(factor_names(&result), vec!["Progressive symptoms"]);
        assert_eq!(result.final_score, 6.0);

        let stable = ClinicalInput {
            progressive_symptoms: false,
            ..input
        };
        let result = score(&stable, "MRI without contrast");
        assert_eq!(factor_names(&result), vec!["Stable prior imaging"]);
        assert_eq!(result.final_score, 4.0);
    }

    #[test]
    fn test_age_applies_once() {
        let child = ClinicalInput { age: Some(8), ..mild_subacute() };
        let elder = ClinicalInput { age: Some(80), ..mild_subacute() };
        let boundary = ClinicalInput { age: Some(65), ..mild_subacute() };
        let unknown = ClinicalInput { age: None, ..mild_subacute() };

        assert_eq!(score(&child, "Ultrasound").final_score, 5.5);
        assert_eq!(score(&elder, "Ultrasound").final_score, 5.5);
        assert_eq!(score(&boundary, "Ultrasound").final_score, 5.0);
        assert_eq!(score(&unknown, "Ultrasound").final_score, 5.0);
    }

    #[test]
    fn test_mild_chronic_is_penalized_twice() {
        let input = ClinicalInput {
            duration: SymptomDuration::Chronic,
            ..mild_subacute()
        };
        let result = score(&input, "X-ray");

        assert_eq!(factor_names(&result), vec!["Chronic duration", "Mild chronic symptoms"]);
        assert_eq!(result.final_score, 3.0);
        assert_eq!(result.category, AppropriatenessCategory::Inappropriate);
        assert!(result.alternative.is_some());
    }

    #[test]
    fn test_all_factors_in_fixed_order_and_clamped() {
        let input = ClinicalInput {
            age: Some(70),
            duration: SymptomDuration::Acute,
            severity: Severity::Severe,
            red_flags: vec!["fever".to_string(), "weight loss".to_string()],
            cancer_history: true,
            immunocompromised: true,
            recent_trauma: true,
            neurologic_deficit: true,
            progressive_symptoms: true,
            prior_imaging: vec!["CT 2024".to_string()],
            ..Default::default()
        };
        let result = score(&input, "CT without contrast");

        assert_eq!(
            factor_names(&result),
            vec![
                "Red flags",
                "Neurologic deficit",
                "Cancer history",
                "Acute onset",
                "Age",
                "Progressive symptoms",
                "Recent trauma",
                "Immunocompromised",
                "Severe symptoms",
            ]
        );
        assert_eq!(result.final_score, MAX_SCORE);
        assert_eq!(result.category, AppropriatenessCategory::Appropriate);
    }

    #[test]
    fn test_score_never_below_minimum() {
        let mut catalog = ModalityCatalog::empty();
        catalog.add(crate::modality::ModalityBaseline {
            name: "Screening".to_string(),
            base_score: 1.5,
            radiation: aiie_core::RadiationLevel::Low,
            cost_estimate: 50,
            alternative: None,
        });
        let engine = ScoringEngine::with_catalog(catalog);
        let input = ClinicalInput {
            duration: SymptomDuration::Chronic,
            severity: Severity::Mild,
            prior_imaging: vec!["x".to_string()],
            ..Default::default()
        };

        let result = engine.score(&input, "Screening");
        assert_eq!(result.final_score, MIN_SCORE);
        assert_eq!(result.category, AppropriatenessCategory::Inappropriate);
    }

    #[test]
    fn test_deterministic() {
        let input = ClinicalInput {
            red_flags: vec!["night pain".to_string()],
            cancer_history: true,
            ..mild_subacute()
        };
        let first = score(&input, "MRI without contrast");
        for _ in 0..10 {
            assert_eq!(score(&input, "MRI without contrast"), first);
        }
    }

    #[test]
    fn test_unknown_modality_uses_default_baseline() {
        let result = score(&mild_subacute(), "Thermography");
        assert_eq!(result.modality, "Thermography");
        assert_eq!(result.final_score, 5.0);
    }

    #[test]
    fn test_missing_input_scores_baseline() {
        let engine = ScoringEngine::new();
        let result = engine.score_optional(None, "X-ray");
        assert_eq!(result.final_score, 4.0);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_rank_is_stable_descending() {
        let ranked = rank(&mild_subacute(), &["Ultrasound", "X-ray", "CT without contrast", "MRI without contrast"]);
        let modalities: Vec<&str> = ranked.iter().map(|r| r.modality.as_str()).collect();

        assert_eq!(
            modalities,
            vec!["Ultrasound", "CT without contrast", "MRI without contrast", "X-ray"]
        );
    }

    #[test]
    fn test_rank_catalog_covers_every_modality() {
        let engine = ScoringEngine::new();
        let ranked = engine.rank_catalog(&mild_subacute());
        assert_eq!(ranked.len(), engine.catalog().modality_names().len());
        assert!(ranked.windows(2).all(|w| w[0].final_score >= w[1].final_score));
    }
}
