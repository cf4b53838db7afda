//! 周排班表
//!
//! 静态循环排班：每个工作日、每个手术间登记若干时段条目，
//! 条目可只在当月部分周次生效。条目的医生声明是和类型（sum type），
//! 解析器按显式分支处理，不作继承式建模。

use orboard_core::Period;
use serde::{Deserialize, Serialize};

/// 全部手术间展示名（含当前未排班的 4 号间）
pub const ALL_OR_ROOMS: [&str; 7] = [
    "ห้องผ่าตัด 1",
    "ห้องผ่าตัด 2",
    "ห้องผ่าตัด 3",
    "ห้องผ่าตัด 4",
    "ห้องผ่าตัด 5",
    "ห้องผ่าตัด 6",
    "ห้องผ่าตัด 8",
];

/// 房间代号转展示名："OR2" -> "ห้องผ่าตัด 2"
pub fn room_display_name(code: &str) -> String {
    format!("ห้องผ่าตัด {}", code.trim_start_matches("OR"))
}

/// 排班条目的医生声明
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DoctorSpec {
    Single(String),    // 单人主刀
    Team(Vec<String>), // 联台（多人共用时段）
    Group(String),     // 分组别名（如 OBGYN_ANY）
    Closed,            // 关台哨兵
}

/// 排班条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub spec: DoctorSpec,
    pub period: Period,
    /// 生效周次（当月第几周）；空集视为从不生效
    pub weeks: Vec<u8>,
}

impl PlanEntry {
    pub fn single(name: &str, period: Period, weeks: &[u8]) -> Self {
        Self {
            spec: DoctorSpec::Single(name.to_string()),
            period,
            weeks: weeks.to_vec(),
        }
    }

    pub fn team(names: &[&str], period: Period, weeks: &[u8]) -> Self {
        Self {
            spec: DoctorSpec::Team(names.iter().map(|n| n.to_string()).collect()),
            period,
            weeks: weeks.to_vec(),
        }
    }

    pub fn group(alias: &str, period: Period, weeks: &[u8]) -> Self {
        Self {
            spec: DoctorSpec::Group(alias.to_string()),
            period,
            weeks: weeks.to_vec(),
        }
    }

    pub fn closed() -> Self {
        Self {
            spec: DoctorSpec::Closed,
            period: Period::AllDay,
            weeks: vec![1, 2, 3, 4],
        }
    }

    /// 条目在给定周次与时段是否生效
    pub fn applies(&self, week: u8, period: Period) -> bool {
        self.weeks.contains(&week) && self.period.covers(period)
    }

    /// 仅按周次筛选（看板整日概览不区分上下午）
    pub fn applies_week(&self, week: u8) -> bool {
        self.weeks.contains(&week)
    }
}

/// 某工作日内一个手术间的条目列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDay {
    pub room: String, // 展示名
    pub entries: Vec<PlanEntry>,
}

/// 周排班表：Mon=0 .. Fri=4，房间按声明顺序保存
///
/// 遍历顺序即决胜顺序：同一天多条目同时命中时取表序靠前者，
/// 不引入额外优先级规则。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyPlan {
    days: Vec<Vec<RoomDay>>,
}

impl WeeklyPlan {
    pub fn new(days: Vec<Vec<RoomDay>>) -> Self {
        debug_assert_eq!(days.len(), 5);
        Self { days }
    }

    /// 取某工作日（Mon=0 .. Fri=4）的房间条目
    pub fn day(&self, weekday: usize) -> &[RoomDay] {
        self.days.get(weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 默认院区周排班（沿用看板现行表）
    pub fn default_hospital() -> Self {
        use Period::{AllDay, Am, Pm};
        const W: &[u8] = &[1, 2, 3, 4];

        let room = |code: &str, entries: Vec<PlanEntry>| RoomDay {
            room: room_display_name(code),
            entries,
        };

        let monday = vec![
            room(
                "OR1",
                vec![
                    PlanEntry::single("นพ.สุริยา คุณาชน", AllDay, &[1]),
                    PlanEntry::single("พญ.รัฐพร ตั้งเพียร", AllDay, &[2]),
                    PlanEntry::single("นพ.พิชัย สุวัฒนพูนลาภ", AllDay, &[3]),
                    PlanEntry::single("นพ.ธนวัฒน์ พันธุ์พรหม", AllDay, &[4]),
                ],
            ),
            room("OR2", vec![PlanEntry::single("นพ.ณัฐพงศ์ ศรีโพนทอง", AllDay, W)]),
            room("OR3", vec![PlanEntry::single("พญ.พิรุณยา แสนวันดี", AllDay, W)]),
            room("OR5", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR6", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR8", vec![PlanEntry::single("พญ.สีชมพู ตั้งสัตยาธิษฐาน", AllDay, W)]),
        ];

        let tuesday = vec![
            room("OR1", vec![PlanEntry::single("พญ.สายฝน บรรณจิตร์", AllDay, W)]),
            room("OR2", vec![PlanEntry::single("นพ.ชัชพล องค์โฆษิต", AllDay, W)]),
            room(
                "OR3",
                vec![
                    PlanEntry::single("พญ.สุภาภรณ์ พิณพาทย์", Am, W),
                    PlanEntry::single("ทพญ.อรุณนภา คิสารัง", Pm, W),
                ],
            ),
            room("OR5", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR6", vec![PlanEntry::single("นพ.พิชัย สุวัฒนพูนลาภ", AllDay, W)]),
            room("OR8", vec![PlanEntry::single("พญ.สาวิตรี ถนอมวงศ์ไทย", AllDay, W)]),
        ];

        let wednesday = vec![
            room("OR1", vec![PlanEntry::single("นพ.สุริยา คุณาชน", AllDay, W)]),
            room("OR2", vec![PlanEntry::single("นพ.วิษณุ ผูกพันธ์", AllDay, W)]),
            room("OR3", vec![PlanEntry::closed()]),
            room("OR5", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR6", vec![PlanEntry::single("พญ.รัฐพร ตั้งเพียร", AllDay, W)]),
            room("OR8", vec![PlanEntry::single("พญ.นันท์นภัส ชีวะเกรียงไกร", AllDay, W)]),
        ];

        let thursday = vec![
            room(
                "OR1",
                vec![
                    PlanEntry::single("พญ.สายฝน บรรณจิตร์", Am, W),
                    PlanEntry::single("นพ.ชัชพล องค์โฆษิต", Pm, &[1, 3]),
                    PlanEntry::team(
                        &["นพ.ณัฐพงศ์ ศรีโพนทอง", "นพ.วิษณุ ผูกพันธ์"],
                        Pm,
                        &[2, 4],
                    ),
                ],
            ),
            room("OR2", vec![PlanEntry::single("นพ.อำนาจ อนันต์วัฒนกุล", AllDay, W)]),
            room(
                "OR3",
                vec![
                    PlanEntry::single("นพ.วรวิช พลเวียงธรรม", Am, W),
                    PlanEntry::single("ทพ.ฉลองรัฐ เดชา", Pm, W),
                ],
            ),
            room("OR5", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR6", vec![PlanEntry::single("นพ.ธนวัฒน์ พันธุ์พรหม", AllDay, W)]),
            room("OR8", vec![PlanEntry::single("พญ.ดวิษา อังศรีประเสริฐ", AllDay, W)]),
        ];

        let friday = vec![
            room("OR1", vec![PlanEntry::single("พญ.สุภาภรณ์ พิณพาทย์", AllDay, W)]),
            room("OR2", vec![PlanEntry::single("นพ.กฤษฎา อิ้งอำพร", AllDay, W)]),
            room("OR3", vec![PlanEntry::single("พญ.สุทธิพร หมวดไธสง", AllDay, W)]),
            room("OR5", vec![PlanEntry::group("OBGYN_ANY", AllDay, W)]),
            room("OR6", vec![PlanEntry::closed()]),
            room("OR8", vec![PlanEntry::single("นพ.สราวุธ สารีย์", AllDay, W)]),
        ];

        Self::new(vec![monday, tuesday, wednesday, thursday, friday])
    }
}

impl Default for WeeklyPlan {
    fn default() -> Self {
        Self::default_hospital()
    }
}
