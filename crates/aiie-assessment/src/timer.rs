//! 计时协调器
//!
//! 倒计时器与时钟抽象。计时器本身不依赖任何调度方式，
//! 由调用方（真实时钟、测试时钟或 [`crate::driver::IntervalTicker`]）驱动 `tick()`。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// 时钟抽象
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟，用于测试和回放
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// 向前推进指定秒数
    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::seconds(seconds);
    }

    pub fn set(&self, time: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 计时器状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerState {
    Idle,    // 未启动
    Running, // 计时中
    Stopped, // 已停止
    Expired, // 已到时
}

/// 单次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// 计时器未运行，本次 tick 被忽略
    Ignored,
    Running { remaining_seconds: u64 },
    /// 本次 tick 使剩余时间归零，只会出现一次
    Expired,
}

/// 倒计时器
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    limit_seconds: u64,
    remaining_seconds: u64,
    state: TimerState,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self {
            limit_seconds: 0,
            remaining_seconds: 0,
            state: TimerState::Idle,
        }
    }

    /// 以给定时限启动
    pub fn start(&mut self, limit_seconds: u64) {
        self.limit_seconds = limit_seconds;
        self.remaining_seconds = limit_seconds;
        self.state = TimerState::Running;
    }

    /// 从快照恢复并继续计时
    pub fn resume(&mut self, limit_seconds: u64, remaining_seconds: u64) {
        self.limit_seconds = limit_seconds.max(remaining_seconds);
        self.remaining_seconds = remaining_seconds;
        self.state = TimerState::Running;
    }

    /// 每秒调用一次
    pub fn tick(&mut self) -> TimerTick {
        if self.state != TimerState::Running {
            return TimerTick::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = TimerState::Expired;
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }

    /// 停止计时，已到时的计时器保持 Expired
    pub fn stop(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn limit_seconds(&self) -> u64 {
        self.limit_seconds
    }

    /// 已经过的秒数
    pub fn elapsed_seconds(&self) -> u64 {
        self.limit_seconds.saturating_sub(self.remaining_seconds)
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}
