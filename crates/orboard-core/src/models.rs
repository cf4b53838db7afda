//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 排班时段粒度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Period {
    AllDay, // 全天
    Am,     // 上午
    Pm,     // 下午
}

impl Period {
    /// 由可选的钟点时刻推导时段：12 点前为上午，否则下午；未提供时默认上午
    pub fn of_time(time: Option<NaiveTime>) -> Self {
        use chrono::Timelike;
        match time {
            Some(t) if t.hour() >= 12 => Period::Pm,
            _ => Period::Am,
        }
    }

    /// ALLDAY 与任意时段兼容
    pub fn covers(&self, other: Period) -> bool {
        matches!(self, Period::AllDay) || *self == other
    }
}

/// 手术类型：按开台时间划分择期与急诊
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SurgeryKind {
    Elective,  // 择期（08:30 - 16:30）
    Emergency, // 急诊
}

impl SurgeryKind {
    pub fn of_start_time(start: Option<NaiveTime>) -> Self {
        use chrono::Timelike;
        let Some(t) = start else {
            return SurgeryKind::Elective;
        };
        let minutes = t.hour() * 60 + t.minute();
        // 择期时间窗 [08:30, 16:30)
        if (510..990).contains(&minutes) {
            SurgeryKind::Elective
        } else {
            SurgeryKind::Emergency
        }
    }
}

/// 患者就绪状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseState {
    Ready,     // 就绪（初始状态）
    OnHold,    // 暂缓（附原因）
    TimedHold, // 定时暂缓（NPO，附恢复时刻）
    OffCase,   // 取消手术（终态）
    Completed, // 已完成确认（终态）
}

impl CaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseState::OffCase | CaseState::Completed)
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaseState::Ready => "Ready",
            CaseState::OnHold => "OnHold",
            CaseState::TimedHold => "TimedHold",
            CaseState::OffCase => "OffCase",
            CaseState::Completed => "Completed",
        };
        write!(f, "{s}")
    }
}

/// 暂缓原因（封闭集合，展示文案沿用病房看板原文）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HoldReason {
    Refusal,               // ปฏิเสธผ่าตัด 拒绝手术
    LabNotReady,           // Lab ไม่พร้อม 检验未就绪
    AwaitingBlood,         // รอให้เลือด 等待输血
    NpoIncomplete,         // NPO ไม่ครบ 禁食时间不足
    HighBloodPressure,     // BP สูง 血压偏高
    LowBloodPressure,      // BP ต่ำ 血压偏低
    ConsultNotPassed,      // Consult ไม่ผ่าน 会诊未通过
    AwaitingFamilyContact, // รอติดต่อญาติ 等待联系家属
    Rescheduled,           // เลื่อนผ่าตัด 延期改约
    Other(String),         // อื่นๆ 其他（自由文本）
}

impl HoldReason {
    /// 看板展示文案（泰文）
    pub fn label(&self) -> String {
        match self {
            HoldReason::Refusal => "ปฏิเสธผ่าตัด".to_string(),
            HoldReason::LabNotReady => "Lab ไม่พร้อม".to_string(),
            HoldReason::AwaitingBlood => "รอให้เลือด".to_string(),
            HoldReason::NpoIncomplete => "NPO ไม่ครบ".to_string(),
            HoldReason::HighBloodPressure => "BP สูง".to_string(),
            HoldReason::LowBloodPressure => "BP ต่ำ".to_string(),
            HoldReason::ConsultNotPassed => "Consult ไม่ผ่าน".to_string(),
            HoldReason::AwaitingFamilyContact => "รอติดต่อญาติ".to_string(),
            HoldReason::Rescheduled => "เลื่อนผ่าตัด".to_string(),
            HoldReason::Other(text) => format!("อื่นๆ: {text}"),
        }
    }
}

impl std::fmt::Display for HoldReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 术中记录（完成确认时要求的最小字段集）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperativeRecord {
    pub start_time: Option<NaiveTime>,     // 开台时间
    pub end_time: Option<NaiveTime>,       // 结束时间
    pub assist1: Option<String>,           // 第一助手
    pub assist2: Option<String>,           // 第二助手（可不填）
    pub scrub_nurse: Option<String>,       // 器械护士
    pub circulate_nurse: Option<String>,   // 巡回护士
}

impl OperativeRecord {
    /// 列出缺失的必填字段名；assist2 不是必填项
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.start_time.is_none() {
            missing.push("start_time".to_string());
        }
        if self.end_time.is_none() {
            missing.push("end_time".to_string());
        }
        if self.assist1.is_none() {
            missing.push("assist1".to_string());
        }
        if self.scrub_nurse.is_none() {
            missing.push("scrub_nurse".to_string());
        }
        if self.circulate_nurse.is_none() {
            missing.push("circulate_nurse".to_string());
        }
        missing
    }
}

/// 手术病例
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgeryCase {
    pub id: Uuid,
    pub hn: String,                        // 院内病历号
    pub patient_name: String,              // 患者姓名
    pub surgeon: String,                   // 主刀医生
    pub department: Option<String>,        // 科室
    pub surgery_date: NaiveDate,           // 手术日期（看板按日加载）
    pub scheduled_time: Option<NaiveTime>, // 预约时刻
    pub room: Option<String>,              // 手术间（未分配时为空）
    pub queue_position: Option<u32>,       // 房间内队列位次（1 起始，连续）
    pub state: CaseState,
    pub hold_reason: Option<HoldReason>,
    pub hold_until: Option<NaiveTime>,     // 定时暂缓的恢复时刻
    pub hold_set_at: Option<NaiveDateTime>, // 定时暂缓的登记时刻（跨午夜判定锚点）
    pub diagnosis: Option<String>,
    pub operation: Option<String>,
    pub ward: Option<String>,
    pub case_size: Option<String>,         // Major / Minor
    pub operative: OperativeRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurgeryCase {
    /// 新建病例，初始即就绪、未入任何队列
    pub fn new(hn: impl Into<String>, patient_name: impl Into<String>, surgeon: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hn: hn.into(),
            patient_name: patient_name.into(),
            surgeon: surgeon.into(),
            department: None,
            surgery_date: Utc::now().date_naive(),
            scheduled_time: None,
            room: None,
            queue_position: None,
            state: CaseState::Ready,
            hold_reason: None,
            hold_until: None,
            hold_set_at: None,
            diagnosis: None,
            operation: None,
            ward: None,
            case_size: None,
            operative: OperativeRecord::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_off_case(&self) -> bool {
        self.state == CaseState::OffCase
    }
}
