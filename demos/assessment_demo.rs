//! 限时考核演示程序
//!
//! 展示完整流程：
//! - 从病例仓库取题并开始限时考核
//! - 作答、标记、跳转与快照恢复
//! - 超时自动提交
//! - 成绩汇入统计、连续天数与成就

use aiie::achievements::{AchievementTracker, StreakData, UserStats};
use aiie::admin::{init_logging, ConfigManager};
use aiie::assessment::{
    load_or_none, storage_key, AssessmentSession, CaseFilter, CaseRepository,
    InMemoryCaseRepository, SessionDriver, SystemClock,
};
use aiie::domain::{
    Assessment, AssessmentCase, ClinicalInput, Difficulty, ImagingOption, SymptomDuration,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load(None)?;
    let config = manager.config().clone();
    init_logging(&config.logging)?;

    println!("AIIE 限时考核演示");
    println!("================================");

    let repository = demo_repository();
    let cases = repository.list_cases(&CaseFilter::default()).await?;
    let options = repository.get_imaging_options().await?;
    let store = manager.snapshot_store()?;
    let first = repository.get_case("stroke").await?;
    println!("  共 {} 题，首题: {}", cases.len(), first.title);

    let assessment = Assessment {
        id: "neuro-basics".to_string(),
        title: "Neuro imaging basics".to_string(),
        time_limit_seconds: 5,
        passing_score: config.assessment.default_passing_score,
    };

    // 第一次作答，中途离开
    println!("\n📝 开始作答...");
    let mut session = AssessmentSession::new(assessment.clone(), Arc::clone(&store), Arc::new(SystemClock))
        .with_grading_rule(config.assessment.grading_rule)
        .with_imaging_options(options.clone());
    session.start(cases.clone(), assessment.time_limit_seconds);
    session.select_imaging("stroke", &["ct-head".to_string()]);
    session.toggle_flag("stroke");
    session.next();
    let progress = session.progress();
    println!(
        "  已答 {}/{}，标记 {}，当前第 {} 题",
        progress.answered,
        progress.total,
        progress.flagged,
        progress.current_index + 1
    );
    drop(session);

    // 从快照恢复并交给驱动器计时
    println!("\n💾 从快照恢复...");
    let snapshot = load_or_none(store.as_ref(), &storage_key(&assessment.id))
        .ok_or_else(|| anyhow::anyhow!("snapshot missing"))?;
    println!(
        "  快照: 第 {} 题，剩余 {} 秒",
        snapshot.current_case_index + 1,
        snapshot.time_remaining_seconds
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let resumed = AssessmentSession::resume(
        assessment.clone(),
        snapshot,
        cases,
        assessment.time_limit_seconds,
        Arc::clone(&store),
        Arc::new(SystemClock),
    )?
    .with_grading_rule(config.assessment.grading_rule)
    .with_imaging_options(options)
    .with_result_sink(Arc::new(tx));

    let mut driver = SessionDriver::new(resumed, Duration::from_millis(200));
    driver.with_session(|s| s.select_imaging("back-pain", &["xray-lspine".to_string()]));
    driver.start_ticking();

    println!("\n⏰ 等待超时自动提交...");
    let result = rx
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("session finished without a result"))?;
    println!(
        "  得分 {}（{}/{}），{}，用时 {} 秒",
        result.score,
        result.correct_count,
        result.total_cases,
        if result.passed { "通过" } else { "未通过" },
        result.time_used
    );
    for case in &result.per_case_results {
        let scores: Vec<String> = case
            .appropriateness
            .iter()
            .map(|s| format!("{} {:.1}", s.modality, s.final_score))
            .collect();
        println!(
            "  - {}: {} [{}]",
            case.case_id,
            if case.correct { "✔" } else { "✘" },
            scores.join(", ")
        );
    }

    // 汇入统计与成就
    println!("\n🏆 成就判定...");
    let today = chrono::Utc::now().date_naive();
    let mut streak = StreakData::new(config.streak.max_freezes);
    let awarded = streak.award_weekly_freezes(today, config.streak.freezes_per_week_awarded);
    streak.record_activity(today);
    println!("  本周发放冻结卡 {} 张", awarded);

    let mut stats = UserStats::default();
    stats.record_result(&result);
    stats.sync_streak(&streak);

    let mut tracker = AchievementTracker::default();
    for unlocked in tracker.check_achievements(&stats) {
        println!("  解锁: {} (+{})", unlocked.name, unlocked.points);
    }
    println!("  总积分 {}，连续 {} 天", tracker.total_points(), streak.current_streak);

    println!("\n✅ 演示完成！");
    Ok(())
}

fn demo_repository() -> InMemoryCaseRepository {
    let cases = vec![
        AssessmentCase {
            id: "stroke".to_string(),
            title: "Acute focal weakness".to_string(),
            category: "neuro".to_string(),
            difficulty: Difficulty::Beginner,
            clinical_input: Some(ClinicalInput {
                age: Some(70),
                duration: SymptomDuration::Acute,
                neurologic_deficit: true,
                ..Default::default()
            }),
            optimal_imaging_ids: vec!["ct-head".to_string()],
        },
        AssessmentCase {
            id: "back-pain".to_string(),
            title: "Uncomplicated low back pain".to_string(),
            category: "msk".to_string(),
            difficulty: Difficulty::Beginner,
            clinical_input: Some(ClinicalInput {
                age: Some(40),
                duration: SymptomDuration::Subacute,
                ..Default::default()
            }),
            optimal_imaging_ids: vec!["no-imaging".to_string()],
        },
        AssessmentCase {
            id: "headache".to_string(),
            title: "Thunderclap headache".to_string(),
            category: "neuro".to_string(),
            difficulty: Difficulty::Intermediate,
            clinical_input: None,
            optimal_imaging_ids: vec!["ct-head".to_string(), "cta-head".to_string()],
        },
    ];

    let options = vec![
        ImagingOption {
            id: "ct-head".to_string(),
            name: "CT head without contrast".to_string(),
            modality: "CT without contrast".to_string(),
        },
        ImagingOption {
            id: "cta-head".to_string(),
            name: "CT angiography head".to_string(),
            modality: "CT angiography".to_string(),
        },
        ImagingOption {
            id: "xray-lspine".to_string(),
            name: "X-ray lumbar spine".to_string(),
            modality: "X-ray".to_string(),
        },
        ImagingOption {
            id: "no-imaging".to_string(),
            name: "No imaging".to_string(),
            modality: "None".to_string(),
        },
    ];

    InMemoryCaseRepository::new(cases, options)
}
