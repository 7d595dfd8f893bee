//! 配置管理
//!
//! 配置文件与 `AIIE_` 前缀的环境变量叠加加载，加载后按规则校验。
//! 嵌套字段在环境变量中用 `__` 分隔，例如 `AIIE_ASSESSMENT__TICK_INTERVAL_MS=500`。

use aiie_assessment::{FileSnapshotStore, GradingRule, InMemorySnapshotStore, SnapshotStore};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 训练系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// 考核配置
    pub assessment: AssessmentSettings,
    /// 快照存储配置
    pub storage: StorageConfig,
    /// 连续天数配置
    pub streak: StreakConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 考核配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssessmentSettings {
    /// 默认时间限制（秒）
    pub default_time_limit_seconds: u64,
    /// 默认及格分
    pub default_passing_score: u32,
    /// 病例判定规则
    pub grading_rule: GradingRule,
    /// 计时周期（毫秒）
    pub tick_interval_ms: u64,
}

impl AssessmentSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// 快照存储类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory, // 内存，进程退出即丢失
    File,   // 本地 JSON 文件
}

/// 快照存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// 文件存储目录
    pub directory: Option<String>,
}

/// 连续天数配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreakConfig {
    /// 冻结卡上限
    pub max_freezes: u32,
    /// 每周发放的冻结卡数量
    pub freezes_per_week_awarded: u32,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤指令
    pub level: String,
    /// 日志格式
    pub format: LogFormat,
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 当前配置
    config: TrainerConfig,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

impl ConfigManager {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        Self::with_path(config, config_path.map(str::to_string))
    }

    /// 直接使用给定配置
    pub fn from_config(config: TrainerConfig) -> Result<Self> {
        Self::with_path(config, None)
    }

    fn with_path(config: TrainerConfig, config_path: Option<String>) -> Result<Self> {
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path,
            validator,
        })
    }

    fn load_config(config_path: Option<&str>) -> Result<TrainerConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("AIIE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: TrainerConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!(
            "Configuration loaded from {}",
            config_path.unwrap_or("defaults and environment")
        );
        Ok(config)
    }

    /// 获取配置
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// 更新配置，校验失败时保持原配置
    pub fn update_config(&mut self, new_config: TrainerConfig) -> Result<()> {
        self.validator.validate(&new_config)?;
        self.config = new_config;
        info!("Configuration updated successfully");
        Ok(())
    }

    /// 重新校验当前配置
    pub fn validate_config(&self) -> Result<()> {
        self.validator.validate(&self.config)
    }

    /// 输出当前生效配置
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.config).context("Failed to serialize configuration")
    }

    /// 保存配置到文件
    pub fn save(&self, path: &str) -> Result<()> {
        std::fs::write(path, self.to_toml()?).context("Failed to write configuration file")?;
        info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// 按存储配置创建快照存储
    pub fn snapshot_store(&self) -> Result<Arc<dyn SnapshotStore>> {
        build_snapshot_store(&self.config.storage)
    }
}

/// 按存储配置创建快照存储
pub fn build_snapshot_store(storage: &StorageConfig) -> Result<Arc<dyn SnapshotStore>> {
    match storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemorySnapshotStore::new())),
        StorageBackend::File => {
            let directory = storage
                .directory
                .as_deref()
                .context("File snapshot storage requires storage.directory")?;
            Ok(Arc::new(FileSnapshotStore::new(directory)))
        }
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&TrainerConfig) -> Result<()>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "assessment.tick_interval_ms",
                validator: |config| {
                    if config.assessment.tick_interval_ms == 0 {
                        anyhow::bail!("tick interval cannot be 0");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "assessment.default_time_limit_seconds",
                validator: |config| {
                    if config.assessment.default_time_limit_seconds == 0 {
                        anyhow::bail!("time limit cannot be 0");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "assessment.default_passing_score",
                validator: |config| {
                    if config.assessment.default_passing_score > 100 {
                        anyhow::bail!(
                            "passing score {} exceeds 100",
                            config.assessment.default_passing_score
                        );
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "storage.directory",
                validator: |config| {
                    let missing = config
                        .storage
                        .directory
                        .as_deref()
                        .map(|d| d.trim().is_empty())
                        .unwrap_or(true);
                    if config.storage.backend == StorageBackend::File && missing {
                        anyhow::bail!("file backend requires a directory");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map(|_| ())
                        .with_context(|| format!("invalid filter '{}'", config.logging.level))
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置，返回第一条失败的规则
    pub fn validate(&self, config: &TrainerConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {:#}", rule.field_path, e);
                return Err(e.context(format!("Invalid {}", rule.field_path)));
            }
        }

        Ok(())
    }
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            default_time_limit_seconds: 1800, // 30 分钟
            default_passing_score: 70,
            grading_rule: GradingRule::AnyOverlap,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            max_freezes: 2,
            freezes_per_week_awarded: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let manager = ConfigManager::from_config(TrainerConfig::default()).unwrap();
        let config = manager.config();

        assert_eq!(config.assessment.default_time_limit_seconds, 1800);
        assert_eq!(config.assessment.default_passing_score, 70);
        assert_eq!(config.assessment.grading_rule, GradingRule::AnyOverlap);
        assert_eq!(config.assessment.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainer.toml");
        std::fs::write(
            &path,
            "[assessment]\ngrading_rule = \"exact_match\"\ndefault_passing_score = 80\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let manager = ConfigManager::load(Some(path.to_str().unwrap())).unwrap();
        let config = manager.config();

        assert_eq!(config.assessment.grading_rule, GradingRule::ExactMatch);
        assert_eq!(config.assessment.default_passing_score, 80);
        assert_eq!(config.assessment.default_time_limit_seconds, 1800);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rules() {
        let validator = ConfigValidator::new();

        let mut config = TrainerConfig::default();
        config.assessment.tick_interval_ms = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = TrainerConfig::default();
        config.assessment.default_passing_score = 101;
        assert!(validator.validate(&config).is_err());

        let mut config = TrainerConfig::default();
        config.storage.backend = StorageBackend::File;
        assert!(validator.validate(&config).is_err());
        config.storage.directory = Some("./snapshots".to_string());
        assert!(validator.validate(&config).is_ok());

        let mut config = TrainerConfig::default();
        config.logging.level = "aiie=loud".to_string();
        assert!(validator.validate(&config).is_err());
    }

    #[test]
    fn test_update_rejects_invalid_config() {
        let mut manager = ConfigManager::from_config(TrainerConfig::default()).unwrap();
        let mut invalid = TrainerConfig::default();
        invalid.assessment.default_time_limit_seconds = 0;

        assert!(manager.update_config(invalid).is_err());
        assert_eq!(manager.config().assessment.default_time_limit_seconds, 1800);
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrainerConfig::default();
        config.assessment.grading_rule = GradingRule::NoExtraneous;
        config.storage.backend = StorageBackend::File;
        config.storage.directory = Some(dir.path().join("snapshots").display().to_string());

        let manager = ConfigManager::from_config(config.clone()).unwrap();
        let rendered = manager.to_toml().unwrap();
        assert!(rendered.contains("grading_rule = \"no_extraneous\""));

        let path = dir.path().join("saved.toml");
        manager.save(path.to_str().unwrap()).unwrap();
        let reloaded = ConfigManager::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(reloaded.config().assessment, config.assessment);
        assert_eq!(reloaded.config().storage, config.storage);
    }

    #[test]
    fn test_build_file_snapshot_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            backend: StorageBackend::File,
            directory: Some(dir.path().display().to_string()),
        };
        let store = build_snapshot_store(&storage).unwrap();
        assert!(store.load("assessment-missing").unwrap().is_none());

        let no_dir = StorageConfig {
            backend: StorageBackend::File,
            directory: None,
        };
        assert!(build_snapshot_store(&no_dir).is_err());
    }
}
