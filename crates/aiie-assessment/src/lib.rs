//! # AIIE 考核模块
//!
//! 限时考核会话的完整流程：
//! - 会话状态机：Start → InProgress → Completed
//! - 倒计时与可替换时钟
//! - 作答评判与成绩汇总
//! - 会话快照的保存与恢复
//! - 基于 tokio 的周期驱动

pub mod driver;
pub mod grading;
pub mod repository;
pub mod session;
pub mod snapshot;
pub mod state_machine;
pub mod timer;

pub use driver::{IntervalTicker, SessionDriver, TickControl};
pub use grading::{Grader, GradingRule};
pub use repository::{CaseFilter, CaseRepository, InMemoryCaseRepository};
pub use session::{storage_key, AssessmentSession, ResultSink, SessionProgress, TickOutcome};
pub use snapshot::{
    load_or_none, FileSnapshotStore, InMemorySnapshotStore, SessionSnapshot, SnapshotStore,
};
pub use state_machine::{SessionEvent, SessionStateMachine};
pub use timer::{Clock, CountdownTimer, ManualClock, SystemClock, TimerState, TimerTick};
