//! 病例存取与确认端口
//!
//! 看板引擎通过这两个 trait 与外界交互：按日期加载与持久化病例，
//! 以及把需要操作员决定的确认提示发出去。

use async_trait::async_trait;
use chrono::NaiveDate;
use orboard_core::{Result, SurgeryCase};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 病例仓储端口
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// 加载指定手术日期的全部病例
    async fn load_by_date(&self, date: NaiveDate) -> Result<Vec<SurgeryCase>>;

    /// 写回单个病例的最新状态
    async fn persist(&self, case: &SurgeryCase) -> Result<()>;
}

/// 操作员确认通道
///
/// 返回 true 表示操作员确认继续。实现方决定提示如何呈现
/// （弹窗、终端、审批队列）。
#[async_trait]
pub trait ConfirmationChannel: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// 内存仓储，供测试与演示使用
#[derive(Default)]
pub struct InMemoryCaseRepository {
    cases: RwLock<HashMap<Uuid, SurgeryCase>>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, cases: Vec<SurgeryCase>) {
        let mut map = self.cases.write().await;
        for case in cases {
            map.insert(case.id, case);
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<SurgeryCase> {
        self.cases.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn load_by_date(&self, date: NaiveDate) -> Result<Vec<SurgeryCase>> {
        let map = self.cases.read().await;
        let mut cases: Vec<SurgeryCase> = map
            .values()
            .filter(|c| c.surgery_date == date)
            .cloned()
            .collect();
        cases.sort_by_key(|c| c.created_at);
        Ok(cases)
    }

    async fn persist(&self, case: &SurgeryCase) -> Result<()> {
        self.cases.write().await.insert(case.id, case.clone());
        Ok(())
    }
}

/// 总是确认的通道
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationChannel for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-confirming prompt: {}", prompt);
        true
    }
}

/// 总是拒绝的通道
pub struct AutoDeny;

#[async_trait]
impl ConfirmationChannel for AutoDeny {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-denying prompt: {}", prompt);
        false
    }
}
