//! 考核会话状态机
//!
//! 状态只能向前推进：Start -> InProgress -> Completed

use aiie_core::{AiieError, Result, SessionStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 会话事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Started,
    Resumed,
    AnswerChanged,
    Navigated,
    Ticked,
    Submitted,
    TimeExpired,
}

/// 会话状态机
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    transitions: HashMap<(SessionStatus, SessionEvent), SessionStatus>,
}

impl SessionStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert((SessionStatus::Start, SessionEvent::Started), SessionStatus::InProgress);
        transitions.insert((SessionStatus::Start, SessionEvent::Resumed), SessionStatus::InProgress);
        transitions.insert((SessionStatus::InProgress, SessionEvent::AnswerChanged), SessionStatus::InProgress);
        transitions.insert((SessionStatus::InProgress, SessionEvent::Navigated), SessionStatus::InProgress);
        transitions.insert((SessionStatus::InProgress, SessionEvent::Ticked), SessionStatus::InProgress);
        transitions.insert((SessionStatus::InProgress, SessionEvent::Submitted), SessionStatus::Completed);
        transitions.insert((SessionStatus::InProgress, SessionEvent::TimeExpired), SessionStatus::Completed);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: &SessionStatus, event: &SessionEvent) -> bool {
        self.transitions.contains_key(&(*from, *event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: &SessionStatus, event: &SessionEvent) -> Result<SessionStatus> {
        match self.transitions.get(&(*from, *event)) {
            Some(to) => Ok(*to),
            None => Err(AiieError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: &SessionStatus) -> Vec<SessionEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
