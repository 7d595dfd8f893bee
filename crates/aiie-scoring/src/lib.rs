//! # AIIE 评分模块
//!
//! 提供影像检查适宜性评分功能，包括：
//! - 检查方式基线目录：起始得分、辐射等级、费用估算
//! - 多因子加权评分引擎：输出 1-9 分、分类和解释因子
//! - 候选检查方式排序

pub mod engine;
pub mod modality;

// 重新导出主要类型
pub use engine::{clamp_score, rank, score, Adjustment, ScoringEngine, MAX_SCORE, MIN_SCORE};
pub use modality::{ModalityBaseline, ModalityCatalog, DEFAULT_BASE_SCORE};
