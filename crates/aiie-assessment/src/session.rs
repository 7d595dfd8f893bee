//! 考核会话控制器
//!
//! 管理病例顺序、作答记录、倒计时和提交。所有变更都通过命名操作完成，
//! 在错误状态下调用的操作会被静默忽略（返回 `false` / `None`），
//! 因为计时回调和界面事件之间的竞争是正常情况。
//! 每次变更后保存快照；快照存储失败只记录日志，不影响内存中的会话。

use crate::grading::{Grader, GradingRule};
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::state_machine::{SessionEvent, SessionStateMachine};
use crate::timer::{Clock, CountdownTimer, TimerTick};
use aiie_core::utils::{elapsed_seconds, generate_session_id};
use aiie_core::{
    AiieError, Assessment, AssessmentCase, AssessmentResult, CaseAnswer, ImagingOption, Result,
    SessionStatus,
};
use aiie_scoring::ScoringEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 提交结果接收方
pub trait ResultSink: Send + Sync {
    fn accept(&self, result: &AssessmentResult);
}

impl ResultSink for tokio::sync::mpsc::UnboundedSender<AssessmentResult> {
    fn accept(&self, result: &AssessmentResult) {
        if self.send(result.clone()).is_err() {
            warn!("Result receiver dropped for assessment {}", result.assessment_id);
        }
    }
}

/// tick 的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// 会话不在作答中
    Idle,
    Running { remaining_seconds: u64 },
    /// 时间耗尽并已自动提交
    Expired(AssessmentResult),
}

/// 作答进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub remaining: usize,
    pub current_index: usize,
}

/// 考核会话
pub struct AssessmentSession {
    id: String,
    assessment: Assessment,
    status: SessionStatus,
    cases: Vec<AssessmentCase>,
    current_index: usize,
    answers: HashMap<String, CaseAnswer>,
    timer: CountdownTimer,
    started_at: Option<DateTime<Utc>>,
    case_entered_at: Option<DateTime<Utc>>,
    result: Option<AssessmentResult>,
    imaging_options: HashMap<String, ImagingOption>,
    grader: Grader,
    state_machine: SessionStateMachine,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SnapshotStore>,
    result_sink: Option<Arc<dyn ResultSink>>,
}

impl std::fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("id", &self.id)
            .field("assessment_id", &self.assessment.id)
            .field("status", &self.status)
            .field("current_index", &self.current_index)
            .field("time_remaining", &self.timer.remaining_seconds())
            .finish()
    }
}

impl AssessmentSession {
    /// 创建处于 Start 状态的新会话
    pub fn new(assessment: Assessment, store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: generate_session_id(),
            assessment,
            status: SessionStatus::Start,
            cases: Vec::new(),
            current_index: 0,
            answers: HashMap::new(),
            timer: CountdownTimer::new(),
            started_at: None,
            case_entered_at: None,
            result: None,
            imaging_options: HashMap::new(),
            grader: Grader::default(),
            state_machine: SessionStateMachine::new(),
            clock,
            store,
            result_sink: None,
        }
    }

    /// 设置判定规则
    pub fn with_grading_rule(mut self, rule: GradingRule) -> Self {
        self.grader = Grader::new(rule, self.grader.engine().clone());
        self
    }

    /// 设置评分引擎
    pub fn with_scoring_engine(mut self, engine: ScoringEngine) -> Self {
        self.grader = Grader::new(self.grader.rule(), engine);
        self
    }

    /// 设置影像选项，用于对已选影像计算适宜性
    pub fn with_imaging_options(mut self, options: Vec<ImagingOption>) -> Self {
        self.imaging_options = options.into_iter().map(|o| (o.id.clone(), o)).collect();
        self
    }

    /// 设置提交结果接收方
    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.result_sink = Some(sink);
        self
    }

    /// 从快照恢复会话并直接进入作答状态
    ///
    /// `time_limit_seconds` 必须是 `start` 时使用的时限，快照中不保存时限，
    /// 用时按 时限 - 剩余时间 计算。
    pub fn resume(
        assessment: Assessment,
        snapshot: SessionSnapshot,
        cases: Vec<AssessmentCase>,
        time_limit_seconds: u64,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if snapshot.assessment_id != assessment.id {
            return Err(AiieError::Validation(format!(
                "Snapshot belongs to assessment {}, not {}",
                snapshot.assessment_id, assessment.id
            )));
        }
        if snapshot.current_case_index >= cases.len() {
            return Err(AiieError::Validation(format!(
                "Snapshot case index {} out of range for {} cases",
                snapshot.current_case_index,
                cases.len()
            )));
        }
        if snapshot.time_remaining_seconds == 0 {
            return Err(AiieError::Assessment("Snapshot has no time remaining".to_string()));
        }

        let mut session = Self::new(assessment, store, clock);
        session.status = session
            .state_machine
            .transition(&session.status, &SessionEvent::Resumed)?;

        let answers: HashMap<String, CaseAnswer> = snapshot.answers.into_iter().collect();
        session.answers = cases
            .iter()
            .filter_map(|case| answers.get(&case.id).map(|a| (case.id.clone(), a.clone())))
            .collect();
        session.cases = cases;
        session
            .timer
            .resume(time_limit_seconds, snapshot.time_remaining_seconds);
        session.started_at = Some(session.clock.now());
        session.enter_case(snapshot.current_case_index);

        info!(
            "Resumed assessment {} at case {} with {}s remaining",
            session.assessment.id, session.current_index, snapshot.time_remaining_seconds
        );
        session.persist();
        Ok(session)
    }

    /// 开始考核：仅在 Start 状态有效
    pub fn start(&mut self, cases: Vec<AssessmentCase>, time_limit_seconds: u64) -> bool {
        if cases.is_empty() {
            warn!("Refusing to start assessment {} without cases", self.assessment.id);
            return false;
        }
        if !self.apply(SessionEvent::Started) {
            return false;
        }

        self.cases = cases;
        self.timer.start(time_limit_seconds);
        self.started_at = Some(self.clock.now());
        self.enter_case(0);

        info!(
            "Assessment {} started with {} cases and {}s limit",
            self.assessment.id,
            self.cases.len(),
            time_limit_seconds
        );
        self.persist();
        true
    }

    /// 替换某病例的已选影像
    pub fn select_imaging(&mut self, case_id: &str, imaging_ids: &[String]) -> bool {
        if !self.has_case(case_id) || !self.apply(SessionEvent::AnswerChanged) {
            return false;
        }

        self.answers
            .entry(case_id.to_string())
            .or_default()
            .set_selection(imaging_ids);
        self.persist();
        true
    }

    /// 切换病例的标记状态
    pub fn toggle_flag(&mut self, case_id: &str) -> bool {
        if !self.has_case(case_id) || !self.apply(SessionEvent::AnswerChanged) {
            return false;
        }

        let answer = self.answers.entry(case_id.to_string()).or_default();
        answer.flagged = !answer.flagged;
        self.persist();
        true
    }

    /// 跳转到指定病例，越界时忽略
    pub fn go_to_case(&mut self, index: usize) -> bool {
        if index >= self.cases.len() {
            debug!("Ignoring navigation to out-of-range case {}", index);
            return false;
        }
        if !self.apply(SessionEvent::Navigated) {
            return false;
        }

        // 先结算当前病例用时，再记录目标病例的进入时间
        self.close_out_current_case();
        self.enter_case(index);
        self.persist();
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to_case(self.current_index + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(index) => self.go_to_case(index),
            None => false,
        }
    }

    /// 提交考核
    ///
    /// 重复提交返回同一结果，不会重复计时或计分。
    pub fn submit(&mut self) -> Option<AssessmentResult> {
        self.finish(SessionEvent::Submitted)
    }

    /// 每秒调用一次；时间耗尽时自动提交
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state_machine.can_transition(&self.status, &SessionEvent::Ticked) {
            return TickOutcome::Idle;
        }

        match self.timer.tick() {
            TimerTick::Running { remaining_seconds } => {
                self.persist();
                TickOutcome::Running { remaining_seconds }
            }
            TimerTick::Expired => {
                info!("Time expired for assessment {}, auto-submitting", self.assessment.id);
                match self.finish(SessionEvent::TimeExpired) {
                    Some(result) => TickOutcome::Expired(result),
                    None => TickOutcome::Idle,
                }
            }
            TimerTick::Ignored => TickOutcome::Idle,
        }
    }

    /// 重新作答：仅对已完成的会话有效，返回全新的会话
    pub fn retake(&self) -> Option<AssessmentSession> {
        if self.status != SessionStatus::Completed {
            debug!("Retake requested for unfinished session {}", self.id);
            return None;
        }
        Some(self.fresh())
    }

    /// 以相同配置创建新会话
    pub fn fresh(&self) -> AssessmentSession {
        let mut session = AssessmentSession::new(
            self.assessment.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        );
        session.grader = self.grader.clone();
        session.imaging_options = self.imaging_options.clone();
        session.result_sink = self.result_sink.clone();
        session
    }

    /// 当前快照
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            assessment_id: self.assessment.id.clone(),
            answers: self.answers_in_order(),
            current_case_index: self.current_index,
            time_remaining_seconds: self.timer.remaining_seconds(),
            timestamp: self.clock.now(),
        }
    }

    /// 按病例顺序返回作答
    pub fn answers_in_order(&self) -> Vec<(String, CaseAnswer)> {
        self.cases
            .iter()
            .filter_map(|case| {
                self.answers
                    .get(&case.id)
                    .map(|answer| (case.id.clone(), answer.clone()))
            })
            .collect()
    }

    pub fn progress(&self) -> SessionProgress {
        let answered = self.answers.values().filter(|a| a.is_answered()).count();
        SessionProgress {
            total: self.cases.len(),
            answered,
            flagged: self.answers.values().filter(|a| a.flagged).count(),
            remaining: self.cases.len().saturating_sub(answered),
            current_index: self.current_index,
        }
    }

    /// 快照存储使用的键
    pub fn storage_key(&self) -> String {
        storage_key(&self.assessment.id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_case(&self) -> Option<&AssessmentCase> {
        self.cases.get(self.current_index)
    }

    pub fn cases(&self) -> &[AssessmentCase] {
        &self.cases
    }

    pub fn answer(&self, case_id: &str) -> Option<&CaseAnswer> {
        self.answers.get(case_id)
    }

    pub fn time_remaining(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    /// 当前生效的时限（秒）
    pub fn time_limit(&self) -> u64 {
        self.timer.limit_seconds()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    /// 提交或到时的共同路径
    fn finish(&mut self, event: SessionEvent) -> Option<AssessmentResult> {
        if self.status == SessionStatus::Completed {
            debug!("Assessment {} already submitted", self.assessment.id);
            return self.result.clone();
        }
        if !self.state_machine.can_transition(&self.status, &event) {
            debug!("Ignoring {:?} in state {:?}", event, self.status);
            return None;
        }

        self.close_out_current_case();
        self.timer.stop();
        if !self.apply(event) {
            return None;
        }

        let result = self.grader.grade(
            &self.assessment,
            &self.cases,
            &self.answers,
            &self.imaging_options,
            self.timer.elapsed_seconds(),
        );
        self.result = Some(result.clone());

        if let Err(e) = self.store.remove(&self.storage_key()) {
            warn!("Failed to clear snapshot for assessment {}: {}", self.assessment.id, e);
        }
        if let Some(sink) = &self.result_sink {
            sink.accept(&result);
        }

        info!(
            "Assessment {} completed: score {} ({}/{})",
            self.assessment.id, result.score, result.correct_count, result.total_cases
        );
        Some(result)
    }

    /// 校验并执行状态转换，无效时静默忽略
    fn apply(&mut self, event: SessionEvent) -> bool {
        match self.state_machine.transition(&self.status, &event) {
            Ok(next) => {
                self.status = next;
                true
            }
            Err(e) => {
                debug!("Ignoring session event: {}", e);
                false
            }
        }
    }

    fn has_case(&self, case_id: &str) -> bool {
        let known = self.cases.iter().any(|case| case.id == case_id);
        if !known {
            debug!("Ignoring operation for unknown case {}", case_id);
        }
        known
    }

    /// 把进入当前病例以来的秒数累加到该病例
    fn close_out_current_case(&mut self) {
        let Some(entered_at) = self.case_entered_at.take() else {
            return;
        };
        let Some(case_id) = self.cases.get(self.current_index).map(|c| c.id.clone()) else {
            return;
        };

        let seconds = elapsed_seconds(entered_at, self.clock.now());
        self.answers.entry(case_id).or_default().time_spent_seconds += seconds;
    }

    fn enter_case(&mut self, index: usize) {
        self.current_index = index;
        if let Some(case) = self.cases.get(index) {
            self.answers.entry(case.id.clone()).or_default();
        }
        self.case_entered_at = Some(self.clock.now());
    }

    fn persist(&self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&self.storage_key(), &snapshot) {
            warn!("Failed to save snapshot for assessment {}: {}", self.assessment.id, e);
        }
    }
}

/// 考核快照的存储键
pub fn storage_key(assessment_id: &str) -> String {
    format!("assessment-{}", assessment_id)
}
