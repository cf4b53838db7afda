//! 错误定义模块

use thiserror::Error;

/// 看板核心统一错误类型
///
/// 所有失败均为局部可恢复：最坏结果是"未分配房间"或"拒绝本次变更"，
/// 不存在导致进程终止的错误。
#[derive(Error, Debug)]
pub enum OrBoardError {
    #[error("未知医生分组: {0}")]
    UnknownGroup(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态转换: 从 {from} 经 {event}")]
    InvalidTransition { from: String, event: String },

    #[error("终态不可变更: {0}")]
    TerminalState(String),

    #[error("必填术中字段缺失: {0:?}")]
    MissingFields(Vec<String>),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储层错误: {0}")]
    Repository(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 看板核心统一结果类型
pub type Result<T> = std::result::Result<T, OrBoardError>;
