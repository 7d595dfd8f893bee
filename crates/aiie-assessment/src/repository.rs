//! 病例仓库接口
//!
//! 病例和影像选项由外部获取，会话只使用已经取回的不可变数据

use aiie_core::{AiieError, AssessmentCase, Difficulty, ImagingOption, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 病例查询过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<usize>,
}

impl CaseFilter {
    pub fn matches(&self, case: &AssessmentCase) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .map(|category| case.category.eq_ignore_ascii_case(category))
            .unwrap_or(true);
        let difficulty_ok = self
            .difficulty
            .map(|difficulty| case.difficulty == difficulty)
            .unwrap_or(true);

        category_ok && difficulty_ok
    }
}

/// 病例仓库
#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<AssessmentCase>>;
    /// 按 id 取单个病例，不存在时返回 `NotFound`
    async fn get_case(&self, id: &str) -> Result<AssessmentCase>;
    async fn get_imaging_options(&self) -> Result<Vec<ImagingOption>>;
}

/// 内存病例仓库
#[derive(Debug, Clone, Default)]
pub struct InMemoryCaseRepository {
    cases: Vec<AssessmentCase>,
    imaging_options: Vec<ImagingOption>,
}

impl InMemoryCaseRepository {
    pub fn new(cases: Vec<AssessmentCase>, imaging_options: Vec<ImagingOption>) -> Self {
        Self {
            cases,
            imaging_options,
        }
    }

    pub fn add_case(&mut self, case: AssessmentCase) {
        self.cases.push(case);
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<AssessmentCase>> {
        let matching = self.cases.iter().filter(|case| filter.matches(case)).cloned();
        let cases: Vec<AssessmentCase> = match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        };

        tracing::debug!("Case repository returned {} cases", cases.len());
        Ok(cases)
    }

    async fn get_case(&self, id: &str) -> Result<AssessmentCase> {
        self.cases
            .iter()
            .find(|case| case.id == id)
            .cloned()
            .ok_or_else(|| AiieError::NotFound(format!("case {}", id)))
    }

    async fn get_imaging_options(&self) -> Result<Vec<ImagingOption>> {
        Ok(self.imaging_options.clone())
    }
}
