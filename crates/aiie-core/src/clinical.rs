//! 临床输入与适宜性评分结果模型

use serde::{Deserialize, Serialize};

/// 性别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

/// 症状持续时间分级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymptomDuration {
    Acute,    // 急性
    #[default]
    Subacute, // 亚急性
    Chronic,  // 慢性
}

/// 症状严重程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,     // 轻度
    #[default]
    Moderate, // 中度
    Severe,   // 重度
}

/// 实验室检查结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabResult {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub abnormal: bool,
}

/// 患者临床表现
///
/// 每次评分创建一次，评分过程中不会被修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClinicalInput {
    /// 年龄，缺失时不参与年龄调整
    pub age: Option<u32>,
    pub sex: Sex,
    pub chief_complaint: String,
    pub duration: SymptomDuration,
    pub severity: Severity,
    /// 危险信号（red flags）
    pub red_flags: Vec<String>,
    pub cancer_history: bool,
    pub immunocompromised: bool,
    pub recent_trauma: bool,
    pub neurologic_deficit: bool,
    pub progressive_symptoms: bool,
    /// 既往影像检查
    pub prior_imaging: Vec<String>,
    pub labs: Vec<LabResult>,
    pub exam_findings: Vec<String>,
}

impl ClinicalInput {
    /// 是否存在既往影像
    pub fn has_prior_imaging(&self) -> bool {
        !self.prior_imaging.is_empty()
    }
}

/// 适宜性分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppropriatenessCategory {
    Appropriate,   // 通常适宜
    Uncertain,     // 可能适宜
    Inappropriate, // 通常不适宜
}

impl AppropriatenessCategory {
    /// 根据最终得分分类：>= 7 适宜，4..7 不确定，< 4 不适宜
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            AppropriatenessCategory::Appropriate
        } else if score >= 4.0 {
            AppropriatenessCategory::Uncertain
        } else {
            AppropriatenessCategory::Inappropriate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppropriatenessCategory::Appropriate => "appropriate",
            AppropriatenessCategory::Uncertain => "uncertain",
            AppropriatenessCategory::Inappropriate => "inappropriate",
        }
    }
}

impl std::fmt::Display for AppropriatenessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 辐射剂量等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RadiationLevel {
    None,    // 无辐射
    Minimal, // 极低
    Low,     // 低
    Medium,  // 中
    High,    // 高
}

/// 单个解释因子
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShapFactor {
    pub name: String,
    /// 带符号的得分贡献
    pub contribution: f64,
    /// 观测值
    pub value: String,
    pub explanation: String,
    pub citation: String,
}

/// 单个（临床输入, 检查方式）的评分结果
///
/// 派生数据，不作为持久化的事实来源。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringResult {
    pub modality: String,
    /// 取值范围 [1, 9]
    pub final_score: f64,
    pub category: AppropriatenessCategory,
    /// 按固定评估顺序排列
    pub factors: Vec<ShapFactor>,
    pub radiation: RadiationLevel,
    /// 费用估算（美元）
    pub cost_estimate: u32,
    pub alternative: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(AppropriatenessCategory::from_score(9.0), AppropriatenessCategory::Appropriate);
        assert_eq!(AppropriatenessCategory::from_score(7.0), AppropriatenessCategory::Appropriate);
        assert_eq!(AppropriatenessCategory::from_score(6.9), AppropriatenessCategory::Uncertain);
        assert_eq!(AppropriatenessCategory::from_score(4.0), AppropriatenessCategory::Uncertain);
        assert_eq!(AppropriatenessCategory::from_score(3.9), AppropriatenessCategory::Inappropriate);
        assert_eq!(AppropriatenessCategory::from_score(1.0), AppropriatenessCategory::Inappropriate);
    }

    #[test]
    fn test_clinical_input_deserializes_with_defaults() {
        let input: ClinicalInput = serde_json::from_str(
            r#"{"age": 72, "chief_complaint": "headache", "duration": "acute", "neurologic_deficit": true}"#,
        )
        .unwrap();

        assert_eq!(input.age, Some(72));
        assert_eq!(input.duration, SymptomDuration::Acute);
        assert_eq!(input.severity, Severity::Moderate);
        assert!(input.neurologic_deficit);
        assert!(!input.has_prior_imaging());
    }
}
