//! AIIE 命令行工具

use aiie_admin::{init_logging, ConfigManager, LogFormat, LoggingConfig};
use aiie_core::ClinicalInput;
use aiie_scoring::ScoringEngine;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// AIIE 命令行参数
#[derive(Parser, Debug)]
#[command(name = "aiie-cli")]
#[command(about = "影像检查适宜性评分工具")]
struct Args {
    /// 日志级别
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 对单个检查方式评分
    Score {
        /// 临床数据 JSON 文件，省略时按缺失数据处理
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// 检查方式名称
        #[arg(short, long)]
        modality: String,
    },
    /// 对候选检查方式排序，未指定时使用全部目录
    Rank {
        /// 临床数据 JSON 文件
        #[arg(short, long)]
        input: PathBuf,

        /// 候选检查方式，可重复
        #[arg(short, long)]
        modality: Vec<String>,
    },
    /// 列出检查方式目录
    Catalog,
    /// 配置相关操作
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 输出生效配置
    Show {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// 校验配置
    Check {
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&LoggingConfig {
        level: args.log_level.clone(),
        format: LogFormat::Compact,
    })?;

    let engine = ScoringEngine::new();

    match args.command {
        Command::Score { input, modality } => {
            let clinical = input.as_deref().map(read_input).transpose()?;
            let result = engine.score_optional(clinical.as_ref(), &modality);
            info!("Scored {}: {}", result.modality, result.final_score);
            print_json(&result)?;
        }
        Command::Rank { input, modality } => {
            let clinical = read_input(&input)?;
            let ranked = if modality.is_empty() {
                engine.rank_catalog(&clinical)
            } else {
                engine.rank(&clinical, modality.as_slice())
            };
            print_json(&ranked)?;
        }
        Command::Catalog => {
            for name in engine.catalog().modality_names() {
                let baseline = engine.catalog().lookup(name);
                println!(
                    "{:<32} base {:.1}  radiation {:?}  cost ${}",
                    baseline.name, baseline.base_score, baseline.radiation, baseline.cost_estimate
                );
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show { config } => {
                let manager = ConfigManager::load(config.as_deref())?;
                print!("{}", manager.to_toml()?);
            }
            ConfigAction::Check { config } => {
                ConfigManager::load(config.as_deref())?;
                println!("configuration OK");
            }
        },
    }

    Ok(())
}

fn read_input(path: &std::path::Path) -> Result<ClinicalInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clinical input {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse clinical input {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
