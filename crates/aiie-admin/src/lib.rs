//! # AIIE 管理模块
//!
//! 配置加载与校验、日志初始化。

pub mod config;
pub mod logging;

pub use config::{
    build_snapshot_store, AssessmentSettings, ConfigManager, ConfigValidator, LogFormat,
    LoggingConfig, StorageBackend, StorageConfig, StreakConfig, TrainerConfig,
};
pub use logging::{build_filter, init_logging};
