//! 工作流配置
//!
//! 支持配置文件与环境变量（ORBOARD_ 前缀）两级来源。

use chrono::NaiveTime;
use config::{Config, Environment, File};
use orboard_core::{OrBoardError, Result, SurgeryKind};
use serde::{Deserialize, Serialize};

/// 看板工作流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// 定时暂缓扫描周期（秒）
    pub tick_interval_secs: u64,
    /// 未排房队列的定时暂缓是否跨午夜顺延
    pub overnight_unscheduled_holds: bool,
    /// 择期窗口起点（HH:MM，含）
    pub elective_window_start: String,
    /// 择期窗口终点（HH:MM，不含）
    pub elective_window_end: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            overnight_unscheduled_holds: true,
            elective_window_start: "08:30".to_string(),
            elective_window_end: "16:30".to_string(),
        }
    }
}

impl WorkflowConfig {
    /// 从配置文件与环境变量加载
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("tick_interval_secs", 1u64)
            .map_err(|e| OrBoardError::Config(e.to_string()))?
            .set_default("overnight_unscheduled_holds", true)
            .map_err(|e| OrBoardError::Config(e.to_string()))?
            .set_default("elective_window_start", "08:30")
            .map_err(|e| OrBoardError::Config(e.to_string()))?
            .set_default("elective_window_end", "16:30")
            .map_err(|e| OrBoardError::Config(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("ORBOARD"));

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| OrBoardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            return Err(OrBoardError::Config(
                "tick_interval_secs 必须至少为 1".to_string(),
            ));
        }
        let (start, end) = self.elective_window()?;
        if start >= end {
            return Err(OrBoardError::Config(
                "择期窗口起点必须早于终点".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }

    /// 解析择期窗口 [start, end)
    pub fn elective_window(&self) -> Result<(NaiveTime, NaiveTime)> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|e| OrBoardError::Config(format!("择期窗口时刻 {s} 无法解析: {e}")))
        };
        Ok((
            parse(&self.elective_window_start)?,
            parse(&self.elective_window_end)?,
        ))
    }

    /// 按配置窗口判定择期/急诊；窗口解析失败时退回内建缺省窗口
    pub fn surgery_kind_of(&self, start: Option<NaiveTime>) -> SurgeryKind {
        let Ok((lo, hi)) = self.elective_window() else {
            return SurgeryKind::of_start_time(start);
        };
        match start {
            Some(t) if t >= lo && t < hi => SurgeryKind::Elective,
            Some(_) => SurgeryKind::Emergency,
            None => SurgeryKind::Elective,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.tick_interval_secs, 1);
        assert!(config.overnight_unscheduled_holds);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = WorkflowConfig {
            tick_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = WorkflowConfig::load(None).unwrap();
        assert_eq!(config.tick_interval_secs, 1);
        assert_eq!(config.elective_window_start, "08:30");
    }

    #[test]
    fn test_surgery_kind_follows_window() {
        let config = WorkflowConfig::default();
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0);
        assert_eq!(config.surgery_kind_of(t(8, 30)), SurgeryKind::Elective);
        assert_eq!(config.surgery_kind_of(t(16, 30)), SurgeryKind::Emergency);
        assert_eq!(config.surgery_kind_of(t(2, 0)), SurgeryKind::Emergency);
        assert_eq!(config.surgery_kind_of(None), SurgeryKind::Elective);

        // 反向窗口拒绝
        let bad = WorkflowConfig {
            elective_window_start: "18:00".to_string(),
            elective_window_end: "08:00".to_string(),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
