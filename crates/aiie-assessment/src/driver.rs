//! 周期调度驱动
//!
//! 基于 tokio 定时器的周期回调。会话逻辑本身是同步的，
//! 这里只负责按固定周期调用 `tick()`，并保证停止后不会再有回调落到旧会话上。

use crate::session::{AssessmentSession, TickOutcome};
use aiie_core::{AssessmentCase, AssessmentResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// 回调的返回值，决定是否继续调度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    /// 时间耗尽，调用 on_expire 后停止
    Expired,
    /// 已无需继续，直接停止
    Finished,
}

/// 周期调度器
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// 启动周期回调；已在运行时先停止旧任务
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn start<T, E>(&mut self, mut on_tick: T, on_expire: E)
    where
        T: FnMut() -> TickControl + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.stop();

        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成
            interval.tick().await;

            loop {
                interval.tick().await;
                match on_tick() {
                    TickControl::Continue => {}
                    TickControl::Expired => {
                        on_expire();
                        break;
                    }
                    TickControl::Finished => break,
                }
            }
        });

        self.handle = Some(handle);
    }

    /// 停止调度
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Interval ticker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 会话驱动器：持有共享会话并按周期推进计时
#[derive(Debug)]
pub struct SessionDriver {
    session: Arc<Mutex<AssessmentSession>>,
    ticker: IntervalTicker,
}

impl SessionDriver {
    pub fn new(session: AssessmentSession, period: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            ticker: IntervalTicker::new(period),
        }
    }

    /// 开始考核并启动计时
    pub fn start(&mut self, cases: Vec<AssessmentCase>, time_limit_seconds: u64) -> bool {
        if !self.lock().start(cases, time_limit_seconds) {
            return false;
        }
        self.start_ticking();
        true
    }

    /// 为已在作答中的会话（例如恢复的会话）启动计时
    pub fn start_ticking(&mut self) {
        let session = Arc::clone(&self.session);
        let assessment_id = self.lock().assessment().id.clone();

        self.ticker.start(
            move || match lock_session(&session).tick() {
                TickOutcome::Running { .. } => TickControl::Continue,
                TickOutcome::Expired(_) => TickControl::Expired,
                TickOutcome::Idle => TickControl::Finished,
            },
            move || info!("Assessment {} auto-submitted on timeout", assessment_id),
        );
    }

    /// 手动提交，先停止计时
    pub fn submit(&mut self) -> Option<AssessmentResult> {
        self.ticker.stop();
        self.lock().submit()
    }

    /// 丢弃当前会话并换成同一考核的新会话，先停止计时
    pub fn reset(&mut self) {
        self.ticker.stop();
        let mut session = self.lock();
        let fresh = session.fresh();
        *session = fresh;
        info!("Session reset for assessment {}", session.assessment().id);
    }

    /// 在锁内访问会话
    pub fn with_session<R>(&self, f: impl FnOnce(&mut AssessmentSession) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn session(&self) -> Arc<Mutex<AssessmentSession>> {
        Arc::clone(&self.session)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    fn lock(&self) -> MutexGuard<'_, AssessmentSession> {
        lock_session(&self.session)
    }
}

fn lock_session(session: &Mutex<AssessmentSession>) -> MutexGuard<'_, AssessmentSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}
