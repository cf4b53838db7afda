//! # OR 看板工作流模块
//!
//! 提供手术看板的全部可变状态管理，包括：
//! - 就绪状态机：管理患者从就绪到完成/取消的全生命周期
//! - 定时暂缓监视：NPO 倒计时到点自动恢复就绪
//! - 队列协调器：房间内排序与跨房间移动，维护队列位次不变量
//! - 看板引擎：组合解析器、状态机、队列与外部协作方的统一入口

pub mod config;
pub mod countdown;
pub mod engine;
pub mod queue;
pub mod repository;
pub mod state_machine;

// 重新导出主要类型
pub use config::WorkflowConfig;
pub use countdown::{Countdown, HoldWatcher};
pub use engine::{BoardEngine, BoardOverview, OffCaseOutcome};
pub use queue::{MoveDirection, MoveOutcome, QueueCoordinator, RoomOrder};
pub use repository::{
    AutoConfirm, AutoDeny, CaseRepository, ConfirmationChannel, InMemoryCaseRepository,
};
pub use state_machine::{CaseEvent, CaseEventKind, ReadinessStateMachine};
