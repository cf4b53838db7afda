//! # OR 排班模块
//!
//! 提供手术间归属解析所需的全部静态配置与纯函数逻辑，包括：
//! - 医生花名册：按科室维护的唯一权威名单，分组别名由此派生
//! - 姓名匹配器：归一化与容错比对，处理录入尾部笔误
//! - 周排班表：按工作日/房间/周次登记的时段条目
//! - 归属解析器：两遍扫描（精确归属 + 同科室兜底）
//!
//! 本模块内全部为不可变配置上的无副作用查询，可并发调用。

pub mod matcher;
pub mod plan;
pub mod resolver;
pub mod roster;

pub use matcher::NameMatcher;
pub use plan::{DoctorSpec, PlanEntry, RoomDay, WeeklyPlan, ALL_OR_ROOMS};
pub use resolver::{AssignmentResolver, RoomScheduleInfo};
pub use roster::{Department, Roster};
