//! 考核相关数据模型定义

use crate::clinical::{ClinicalInput, ScoringResult};
use serde::{Deserialize, Serialize};

/// 病例难度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// 影像检查选项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagingOption {
    pub id: String,
    pub name: String,
    /// 对应评分引擎中的检查方式名称
    pub modality: String,
}

/// 临床病例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentCase {
    pub id: String,
    pub title: String,
    /// 专科分类（如 neuro、msk、chest）
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// 临床数据可能缺失，缺失时评分回退到基线
    #[serde(default)]
    pub clinical_input: Option<ClinicalInput>,
    /// 预定义的最佳影像选项ID
    pub optimal_imaging_ids: Vec<String>,
}

/// 考核定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub time_limit_seconds: u64,
    /// 及格分（百分制）
    pub passing_score: u32,
}

/// 单个病例的作答
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaseAnswer {
    /// 有序且不重复
    pub selected_imaging_ids: Vec<String>,
    pub flagged: bool,
    /// 累计用时（秒），只增不减
    pub time_spent_seconds: u64,
}

impl CaseAnswer {
    /// 替换已选影像，保持首次出现顺序并去重
    pub fn set_selection(&mut self, imaging_ids: &[String]) {
        let mut selection: Vec<String> = Vec::with_capacity(imaging_ids.len());
        for id in imaging_ids {
            if !selection.contains(id) {
                selection.push(id.clone());
            }
        }
        self.selected_imaging_ids = selection;
    }

    pub fn is_answered(&self) -> bool {
        !self.selected_imaging_ids.is_empty()
    }
}

/// 考核会话状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Start,      // 未开始
    InProgress, // 作答中
    Completed,  // 已提交
}

/// 单个病例的评判结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResult {
    pub case_id: String,
    pub category: String,
    pub selected_imaging_ids: Vec<String>,
    pub optimal_imaging_ids: Vec<String>,
    pub correct: bool,
    pub flagged: bool,
    pub time_spent_seconds: u64,
    /// 已选影像的适宜性评分
    pub appropriateness: Vec<ScoringResult>,
}

/// 提交后的最终结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResult {
    pub assessment_id: String,
    /// 百分制得分
    pub score: u32,
    pub correct_count: usize,
    pub total_cases: usize,
    pub passed: bool,
    /// 已用时间（秒）
    pub time_used: u64,
    pub per_case_results: Vec<CaseResult>,
}

impl AssessmentResult {
    pub fn is_perfect(&self) -> bool {
        self.total_cases > 0 && self.correct_count == self.total_cases
    }
}
