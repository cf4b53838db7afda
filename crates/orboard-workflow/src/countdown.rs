//! NPO 定时暂缓倒计时
//!
//! 恢复时刻存储为一天内的时间（NaiveTime）。对未排房的急诊队列，
//! 设定时刻不晚于恢复时刻时视为跨午夜：恢复锚定到次日。
//! 锚点固定在设定时刻（`hold_set_at`），倒计时不会随当前时间漂移。

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tokio::time::interval;

use crate::engine::BoardEngine;

/// 由恢复时刻与设定时刻计算恢复的绝对时间点
pub fn resume_instant(resume_at: NaiveTime, set_at: NaiveDateTime, overnight: bool) -> NaiveDateTime {
    let mut instant = set_at.date().and_time(resume_at);
    if overnight && resume_at <= set_at.time() {
        instant += Duration::days(1);
    }
    instant
}

/// 倒计时状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// 已到点
    Due,
    /// 剩余时长
    Remaining(Duration),
}

/// 计算某个定时暂缓此刻的倒计时
pub fn countdown(
    resume_at: NaiveTime,
    set_at: NaiveDateTime,
    now: NaiveDateTime,
    overnight: bool,
) -> Countdown {
    let instant = resume_instant(resume_at, set_at, overnight);
    if now >= instant {
        Countdown::Due
    } else {
        Countdown::Remaining(instant - now)
    }
}

impl Countdown {
    /// 看板展示用的泰文格式
    pub fn format_thai(&self) -> String {
        match self {
            Countdown::Due => "ครบกำหนด".to_string(),
            Countdown::Remaining(d) => {
                let hours = d.num_hours();
                let minutes = d.num_minutes() % 60;
                if hours > 0 {
                    format!("{hours} ชม. {minutes} นาที")
                } else {
                    format!("{minutes} นาที")
                }
            }
        }
    }
}

/// 定时暂缓监视任务
///
/// 周期性扫描到点病例并触发自动恢复。扫描是幂等的：
/// 只有仍处于定时暂缓的病例会被恢复，手动提前恢复不受影响。
pub struct HoldWatcher {
    engine: Arc<BoardEngine>,
    tick: std::time::Duration,
}

impl HoldWatcher {
    pub fn new(engine: Arc<BoardEngine>, tick: std::time::Duration) -> Self {
        Self { engine, tick }
    }

    /// 运行监视循环，直到任务被取消
    pub async fn run(self) {
        let mut ticker = interval(self.tick);
        loop {
            ticker.tick().await;
            let now = Local::now().naive_local();
            if let Err(e) = self.engine.run_due_transitions(now).await {
                tracing::error!("Timed hold sweep failed: {}", e);
            }
        }
    }
}
