//! 患者就绪状态机
//!
//! 管理手术病例的就绪生命周期。状态转换规则由表驱动，
//! 带载荷的事件（暂缓原因、恢复时刻）在 `apply` 中校验。
//!
//! OffCase 与 Completed 为终态：没有任何事件可以离开，
//! 上层必须拒绝对终态病例的进一步变更（纯展示除外）。

use chrono::{NaiveDateTime, NaiveTime, Utc};
use orboard_core::{CaseState, HoldReason, OrBoardError, Result, SurgeryCase};
use std::collections::HashMap;

/// 状态转换事件
#[derive(Debug, Clone, PartialEq)]
pub enum CaseEvent {
    /// 记录暂缓原因（封闭集合）
    Hold(HoldReason),
    /// NPO 定时暂缓：附恢复时刻
    HoldTimed(HoldReason, NaiveTime),
    /// 操作员手动标记就绪
    MarkReady,
    /// 定时暂缓到点（自动，由监视任务触发）
    ResumeDue,
    /// 拒绝手术最终取消（不可逆，上层须二次确认）
    OffCase,
    /// 拒绝手术改为延期（仅是另一种暂缓原因，非终态）
    Reschedule,
    /// 完成确认（上层先校验必填术中字段）
    Complete,
}

/// 事件种类（转换表的键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseEventKind {
    Hold,
    HoldTimed,
    MarkReady,
    ResumeDue,
    OffCase,
    Reschedule,
    Complete,
}

impl CaseEvent {
    pub fn kind(&self) -> CaseEventKind {
        match self {
            CaseEvent::Hold(_) => CaseEventKind::Hold,
            CaseEvent::HoldTimed(_, _) => CaseEventKind::HoldTimed,
            CaseEvent::MarkReady => CaseEventKind::MarkReady,
            CaseEvent::ResumeDue => CaseEventKind::ResumeDue,
            CaseEvent::OffCase => CaseEventKind::OffCase,
            CaseEvent::Reschedule => CaseEventKind::Reschedule,
            CaseEvent::Complete => CaseEventKind::Complete,
        }
    }
}

/// 就绪状态机
#[derive(Debug)]
pub struct ReadinessStateMachine {
    transitions: HashMap<(CaseState, CaseEventKind), CaseState>,
}

impl ReadinessStateMachine {
    /// 创建状态机实例并登记全部转换规则
    pub fn new() -> Self {
        use CaseEventKind as E;
        use CaseState as S;
        let mut transitions = HashMap::new();

        // 记录/更换暂缓原因
        transitions.insert((S::Ready, E::Hold), S::OnHold);
        transitions.insert((S::OnHold, E::Hold), S::OnHold);
        transitions.insert((S::TimedHold, E::Hold), S::OnHold);

        // NPO 定时暂缓
        transitions.insert((S::Ready, E::HoldTimed), S::TimedHold);
        transitions.insert((S::OnHold, E::HoldTimed), S::TimedHold);
        transitions.insert((S::TimedHold, E::HoldTimed), S::TimedHold);

        // 恢复就绪：手动或到点自动
        transitions.insert((S::OnHold, E::MarkReady), S::Ready);
        transitions.insert((S::TimedHold, E::MarkReady), S::Ready);
        transitions.insert((S::TimedHold, E::ResumeDue), S::Ready);

        // 拒绝手术的两个去向
        transitions.insert((S::OnHold, E::OffCase), S::OffCase);
        transitions.insert((S::OnHold, E::Reschedule), S::OnHold);

        // 完成确认可从任意非终态进入
        transitions.insert((S::Ready, E::Complete), S::Completed);
        transitions.insert((S::OnHold, E::Complete), S::Completed);
        transitions.insert((S::TimedHold, E::Complete), S::Completed);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: CaseState, event: CaseEventKind) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 查表执行状态转换
    pub fn transition(&self, from: CaseState, event: CaseEventKind) -> Result<CaseState> {
        if from.is_terminal() {
            return Err(OrBoardError::TerminalState(from.to_string()));
        }
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(OrBoardError::InvalidTransition {
                from: from.to_string(),
                event: format!("{event:?}"),
            }),
        }
    }

    /// 校验载荷并将事件应用到病例上
    ///
    /// `now` 为看板墙钟时刻，用作定时暂缓的跨午夜锚点。
    pub fn apply(&self, case: &mut SurgeryCase, event: CaseEvent, now: NaiveDateTime) -> Result<CaseState> {
        // 载荷与前置条件校验
        match &event {
            CaseEvent::HoldTimed(reason, _) if *reason != HoldReason::NpoIncomplete => {
                // 只有 NPO 支持定时恢复
                return Err(OrBoardError::InvalidTransition {
                    from: case.state.to_string(),
                    event: format!("HoldTimed({reason:?})"),
                });
            }
            CaseEvent::OffCase | CaseEvent::Reschedule
                if case.hold_reason != Some(HoldReason::Refusal) =>
            {
                // OFF Case 与延期只在"拒绝手术"暂缓下有意义
                return Err(OrBoardError::InvalidTransition {
                    from: case.state.to_string(),
                    event: format!("{:?}", event.kind()),
                });
            }
            _ => {}
        }

        let new_state = self.transition(case.state, event.kind())?;

        match event {
            CaseEvent::Hold(reason) => {
                case.hold_reason = Some(reason);
                case.hold_until = None;
                case.hold_set_at = None;
            }
            CaseEvent::HoldTimed(reason, resume_at) => {
                case.hold_reason = Some(reason);
                case.hold_until = Some(resume_at);
                case.hold_set_at = Some(now);
            }
            CaseEvent::MarkReady | CaseEvent::ResumeDue => {
                case.hold_reason = None;
                case.hold_until = None;
                case.hold_set_at = None;
            }
            CaseEvent::Reschedule => {
                case.hold_reason = Some(HoldReason::Rescheduled);
                case.hold_until = None;
                case.hold_set_at = None;
            }
            // 终态保留最后的暂缓原因供审计展示
            CaseEvent::OffCase | CaseEvent::Complete => {}
        }

        let old_state = case.state;
        case.state = new_state;
        case.updated_at = Utc::now();

        tracing::info!(
            "Case {} state transitioned from {} to {}",
            case.id,
            old_state,
            new_state
        );
        Ok(new_state)
    }
}

impl Default for ReadinessStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
