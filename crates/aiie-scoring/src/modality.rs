//! 检查方式基线目录
//!
//! 每种检查方式的起始得分、辐射等级、费用估算和替代建议

use aiie_core::RadiationLevel;
use serde::{Deserialize, Serialize};

/// 检查方式基线
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalityBaseline {
    pub name: String,
    pub base_score: f64,
    pub radiation: RadiationLevel,
    pub cost_estimate: u32,
    /// 判定为不适宜时给出的替代建议
    pub alternative: Option<String>,
}

/// 未知检查方式使用的默认基线
pub const DEFAULT_BASE_SCORE: f64 = 5.0;
const DEFAULT_COST_ESTIMATE: u32 = 500;
const DEFAULT_ALTERNATIVE: &str =
    "Consider clinical observation or a lower-cost, lower-radiation study before advanced imaging";

/// 检查方式目录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityCatalog {
    baselines: Vec<ModalityBaseline>,
    default_baseline: ModalityBaseline,
}

impl ModalityCatalog {
    /// 创建空目录，仅包含默认基线
    pub fn empty() -> Self {
        Self {
            baselines: Vec::new(),
            default_baseline: ModalityBaseline {
                name: "Unspecified imaging".to_string(),
                base_score: DEFAULT_BASE_SCORE,
                radiation: RadiationLevel::Low,
                cost_estimate: DEFAULT_COST_ESTIMATE,
                alternative: Some(DEFAULT_ALTERNATIVE.to_string()),
            },
        }
    }

    /// 标准目录
    pub fn standard() -> Self {
        let mut catalog = Self::empty();

        catalog.add(baseline("CT without contrast", 5.0, RadiationLevel::Medium, 450,
            "MRI without contrast when available; avoids ionizing radiation"));
        catalog.add(baseline("CT with contrast", 5.0, RadiationLevel::Medium, 600,
            "CT without contrast or ultrasound depending on the clinical question"));
        catalog.add(baseline("CT angiography", 4.5, RadiationLevel::High, 800,
            "Duplex ultrasound or MR angiography"));
        catalog.add(baseline("MRI without contrast", 5.0, RadiationLevel::None, 1200,
            "Plain radiographs and conservative management for 6 weeks"));
        catalog.add(baseline("MRI with and without contrast", 4.5, RadiationLevel::None, 1800,
            "MRI without contrast unless infection or malignancy is suspected"));
        catalog.add(baseline("X-ray", 4.0, RadiationLevel::Minimal, 100,
            "Clinical follow-up without imaging"));
        catalog.add(baseline("Ultrasound", 5.0, RadiationLevel::None, 250,
            "Clinical follow-up without imaging"));
        catalog.add(baseline("Nuclear medicine bone scan", 4.0, RadiationLevel::Medium, 900,
            "MRI without contrast"));

        catalog
    }

    /// 添加或替换基线
    pub fn add(&mut self, baseline: ModalityBaseline) {
        if let Some(existing) = self.baselines.iter_mut().find(|b| b.name == baseline.name) {
            *existing = baseline;
        } else {
            self.baselines.push(baseline);
        }
    }

    /// 查找基线：精确匹配，其次忽略大小写，最后回退到默认基线
    pub fn lookup(&self, modality: &str) -> &ModalityBaseline {
        self.find(modality).unwrap_or_else(|| {
            tracing::debug!("Unknown modality '{}', using default baseline", modality);
            &self.default_baseline
        })
    }

    /// 查找已知基线
    pub fn find(&self, modality: &str) -> Option<&ModalityBaseline> {
        let trimmed = modality.trim();
        self.baselines
            .iter()
            .find(|b| b.name == trimmed)
            .or_else(|| self.baselines.iter().find(|b| b.name.eq_ignore_ascii_case(trimmed)))
    }

    pub fn contains(&self, modality: &str) -> bool {
        self.find(modality).is_some()
    }

    /// 所有已知检查方式名称（按添加顺序）
    pub fn modality_names(&self) -> Vec<&str> {
        self.baselines.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn default_baseline(&self) -> &ModalityBaseline {
        &self.default_baseline
    }
}

impl Default for ModalityCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn baseline(
    name: &str,
    base_score: f64,
    radiation: RadiationLevel,
    cost_estimate: u32,
    alternative: &str,
) -> ModalityBaseline {
    ModalityBaseline {
        name: name.to_string(),
        base_score,
        radiation,
        cost_estimate,
        alternative: Some(alternative.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_and_case_insensitive() {
        let catalog = ModalityCatalog::standard();

        let exact = catalog.lookup("CT without contrast");
        assert_eq!(exact.base_score, 5.0);
        assert_eq!(exact.radiation, RadiationLevel::Medium);

        let relaxed = catalog.lookup("ct WITHOUT contrast ");
        assert_eq!(relaxed.name, "CT without contrast");
    }

    #[test]
    fn test_unknown_modality_falls_back() {
        let catalog = ModalityCatalog::standard();
        let fallback = catalog.lookup("PET-MRI hybrid");

        assert_eq!(fallback.base_score, DEFAULT_BASE_SCORE);
        assert_eq!(fallback.name, catalog.default_baseline().name);
        assert!(!catalog.contains("PET-MRI hybrid"));
    }

    #[test]
    fn test_add_replaces_existing() {
        let mut catalog = ModalityCatalog::standard();
        let count = catalog.modality_names().len();

        catalog.add(baseline("X-ray", 6.0, RadiationLevel::Minimal, 80, "none"));

        assert_eq!(catalog.modality_names().len(), count);
        assert_eq!(catalog.lookup("X-ray").base_score, 6.0);
    }
}
