//! 适宜性评分演示程序
//!
//! 对一个急性神经系统病例计算各检查方式的得分并排序

use aiie::domain::{ClinicalInput, Severity, SymptomDuration};
use aiie::scoring::ScoringEngine;

fn main() -> anyhow::Result<()> {
    init_demo_logging();

    println!("AIIE 评分演示");
    println!("================================");

    let input = ClinicalInput {
        age: Some(72),
        chief_complaint: "sudden right arm weakness".to_string(),
        duration: SymptomDuration::Acute,
        severity: Severity::Severe,
        neurologic_deficit: true,
        red_flags: vec!["focal weakness".to_string()],
        ..Default::default()
    };

    let engine = ScoringEngine::new();

    println!("\n单项评分: CT without contrast");
    let result = engine.score(&input, "CT without contrast");
    println!(
        "  得分 {:.1} ({})，辐射 {:?}，费用 ${}",
        result.final_score, result.category, result.radiation, result.cost_estimate
    );
    for factor in &result.factors {
        println!("  {:+.1}  {}: {}", factor.contribution, factor.name, factor.explanation);
    }

    println!("\n全部检查方式排序:");
    for (rank, scored) in engine.rank_catalog(&input).iter().enumerate() {
        println!(
            "  {}. {:<32} {:.1} {}",
            rank + 1,
            scored.modality,
            scored.final_score,
            scored.category
        );
    }

    println!("\n缺失临床数据时的基线得分:");
    let baseline = engine.score_optional(None, "MRI without contrast");
    println!("  {} → {:.1}", baseline.modality, baseline.final_score);

    println!("\n完整结果 JSON:");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn init_demo_logging() {
    let config = aiie::admin::LoggingConfig::default();
    if let Err(e) = aiie::admin::init_logging(&config) {
        eprintln!("logging disabled: {}", e);
    }
}
