//! 归属解析器
//!
//! 医生 + 日期（+ 可选时刻）映射到手术间。两遍扫描：
//! 先找精确归属（本人被条目直接登记），找不到再按同科室兜底 ——
//! 同专科医生互相代台是常态，但精确归属必须优先于科室邻近。
//!
//! 房间遍历顺序即周排班表声明顺序，决胜依赖该顺序且保持稳定。

use crate::matcher::NameMatcher;
use crate::plan::{DoctorSpec, PlanEntry, RoomDay, WeeklyPlan};
use chrono::{NaiveDate, NaiveTime};
use orboard_core::calendar::{week_of_month, weekday_index};
use orboard_core::Period;

/// 看板整日概览的单房间信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomScheduleInfo {
    pub doctor: String, // 展示文案（关台为 ปิดห้อง，分组展示去掉 _ANY 后缀）
    pub period: String, // ทั้งวัน / เช้า / บ่าย 组合
}

/// 归属解析器
///
/// 周排班表与匹配器均为启动时装配的不可变配置，解析无副作用，可并发调用。
#[derive(Debug, Clone)]
pub struct AssignmentResolver {
    plan: WeeklyPlan,
    matcher: NameMatcher,
}

impl AssignmentResolver {
    pub fn new(plan: WeeklyPlan, matcher: NameMatcher) -> Self {
        Self { plan, matcher }
    }

    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    /// 解析医生在给定日期/时刻应进入的手术间；无法判定时返回 None（留待人工指派）
    pub fn resolve(&self, surgeon: &str, date: NaiveDate, time: Option<NaiveTime>) -> Option<String> {
        // 周末不存在排班房间
        let weekday = weekday_index(date)?;
        let week = week_of_month(date);
        let period = Period::of_time(time);
        let day = self.plan.day(weekday);

        // 第一遍：精确归属
        if let Some(room) = self.exact_pass(surgeon, day, week, period) {
            return Some(room);
        }

        // 第二遍：同科室兜底；科室未知则直接放弃
        let dept = self.matcher.department_of(surgeon)?;
        self.fallback_pass(&dept, day, week, period)
    }

    /// 第一遍：逐房间逐条目扫描，医生被条目直接登记即命中，取表序第一个
    fn exact_pass(&self, surgeon: &str, day: &[RoomDay], week: u8, period: Period) -> Option<String> {
        let mut matched: Vec<&str> = Vec::new();
        for room_day in day {
            for entry in &room_day.entries {
                if !entry.applies(week, period) {
                    continue;
                }
                if self.matcher.matches_spec(surgeon, &entry.spec) {
                    matched.push(&room_day.room);
                    break; // 同一房间内后续条目不再累计
                }
            }
        }

        if matched.len() > 1 {
            // 配置重叠：按表序取第一个，不猜测"正确"优先级
            tracing::warn!(
                "Ambiguous plan entries for {}: {:?}, first in table order wins",
                surgeon,
                matched
            );
        }
        matched.first().map(|r| r.to_string())
    }

    /// 第二遍：展开各条目的医生名单（跳过关台），任一登记医生与目标同科室即命中
    fn fallback_pass(&self, dept: &str, day: &[RoomDay], week: u8, period: Period) -> Option<String> {
        for room_day in day {
            for entry in &room_day.entries {
                if !entry.applies(week, period) {
                    continue;
                }
                for owner in self.effective_doctors(entry) {
                    if self.matcher.department_of(&owner).as_deref() == Some(dept) {
                        return Some(room_day.room.clone());
                    }
                }
            }
        }
        None
    }

    /// 展开条目医生声明为具体名单；关台为空，未知分组按空处理（失败安全）
    fn effective_doctors(&self, entry: &PlanEntry) -> Vec<String> {
        match &entry.spec {
            DoctorSpec::Single(name) => vec![name.clone()],
            DoctorSpec::Team(names) => names.clone(),
            DoctorSpec::Group(alias) => match self.matcher.roster().expand_group(alias) {
                Ok(members) => members.to_vec(),
                Err(_) => {
                    tracing::warn!("Unknown doctor group {} in weekly plan, entry skipped", alias);
                    Vec::new()
                }
            },
            DoctorSpec::Closed => Vec::new(),
        }
    }

    /// 目标房间当日（按时段筛选后）是否归属给定医生
    ///
    /// 返回 None 表示该房间当日没有可识别的归属（未排班或关台），
    /// 此时跨房间移动无需确认。
    pub fn owner_matches(
        &self,
        room: &str,
        date: NaiveDate,
        period: Period,
        surgeon: &str,
    ) -> Option<bool> {
        let weekday = weekday_index(date)?;
        let week = week_of_month(date);
        let room_day = self.plan.day(weekday).iter().find(|rd| rd.room == room)?;

        let mut has_owner = false;
        for entry in &room_day.entries {
            if !entry.applies(week, period) || entry.spec == DoctorSpec::Closed {
                continue;
            }
            has_owner = true;
            if self.matcher.matches_spec(surgeon, &entry.spec) {
                return Some(true);
            }
        }
        has_owner.then_some(false)
    }

    /// 房间当日归属医生的展示文案（用于跨房间移动的确认提示）
    pub fn owner_display(&self, room: &str, date: NaiveDate) -> Option<String> {
        self.schedule_for_date(date)
            .into_iter()
            .find(|(r, _)| r == room)
            .map(|(_, info)| info.doctor)
    }

    /// 看板整日概览：各房间当日登记的医生与时段（不按上下午筛选）
    pub fn schedule_for_date(&self, date: NaiveDate) -> Vec<(String, RoomScheduleInfo)> {
        let Some(weekday) = weekday_index(date) else {
            return Vec::new();
        };
        let week = week_of_month(date);

        let mut result = Vec::new();
        for room_day in self.plan.day(weekday) {
            let mut doctors: Vec<String> = Vec::new();
            let mut closed = false;
            let mut period = String::new();

            for entry in &room_day.entries {
                if !entry.applies_week(week) {
                    continue;
                }
                match &entry.spec {
                    DoctorSpec::Single(name) => doctors.push(name.clone()),
                    DoctorSpec::Team(names) => doctors.extend(names.iter().cloned()),
                    DoctorSpec::Group(alias) => {
                        doctors.push(alias.trim_end_matches("_ANY").to_string())
                    }
                    DoctorSpec::Closed => closed = true,
                }
                let label = match entry.period {
                    Period::AllDay => "ทั้งวัน",
                    Period::Am => "เช้า",
                    Period::Pm => "บ่าย",
                };
                if period.is_empty() {
                    period = label.to_string();
                } else {
                    period = format!("{period}/{label}");
                }
            }

            if closed {
                result.push((
                    room_day.room.clone(),
                    RoomScheduleInfo {
                        doctor: "ปิดห้อง".to_string(),
                        period,
                    },
                ));
            } else if !doctors.is_empty() {
                result.push((
                    room_day.room.clone(),
                    RoomScheduleInfo {
                        doctor: doctors.join(", "),
                        period,
                    },
                ));
            }
        }
        result
    }
}

impl Default for AssignmentResolver {
    fn default() -> Self {
        use crate::roster::Roster;
        use std::sync::Arc;
        let roster = Arc::new(Roster::default_hospital());
        Self::new(WeeklyPlan::default_hospital(), NameMatcher::new(roster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> AssignmentResolver {
        AssignmentResolver::default()
    }

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    // 2025-09-01 周一且为当月第 1 周，之后每加 7 天周次加一
    fn monday_of_week(week: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1 + (week - 1) * 7).unwrap()
    }

    #[test]
    fn test_exact_owner_resolves_all_weeks() {
        let r = resolver();
        // 周一 OR2 全周次归属
        for week in 1..=4 {
            assert_eq!(
                r.resolve("นพ.ณัฐพงศ์ ศรีโพนทอง", monday_of_week(week), t(9, 0)),
                Some("ห้องผ่าตัด 2".to_string())
            );
        }
    }

    #[test]
    fn test_weekend_is_unassigned() {
        let r = resolver();
        let sat = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let sun = NaiveDate::from_ymd_opt(2025, 9, 7).unwrap();
        assert_eq!(r.resolve("นพ.ณัฐพงศ์ ศรีโพนทอง", sat, t(9, 0)), None);
        assert_eq!(r.resolve("นพ.ณัฐพงศ์ ศรีโพนทอง", sun, None), None);
    }

    #[test]
    fn test_week_rotation() {
        let r = resolver();
        // 周一 OR1 按周次轮换
        assert_eq!(
            r.resolve("นพ.สุริยา คุณาชน", monday_of_week(1), None),
            Some("ห้องผ่าตัด 1".to_string())
        );
        assert_eq!(
            r.resolve("พญ.รัฐพร ตั้งเพียร", monday_of_week(2), None),
            Some("ห้องผ่าตัด 1".to_string())
        );
        assert_eq!(
            r.resolve("นพ.พิชัย สุวัฒนพูนลาภ", monday_of_week(3), None),
            Some("ห้องผ่าตัด 1".to_string())
        );
    }

    #[test]
    fn test_department_fallback_after_exact_miss() {
        let r = resolver();
        // 第 2 周周一：OR1 归属 พญ.รัฐพร（普外），นพ.สุริยา（同科室）无精确归属，
        // 兜底进入同科室房间
        assert_eq!(
            r.resolve("นพ.สุริยา คุณาชน", monday_of_week(2), None),
            Some("ห้องผ่าตัด 1".to_string())
        );
        // 房主本人走精确归属，不受兜底影响
        assert_eq!(
            r.resolve("พญ.รัฐพร ตั้งเพียร", monday_of_week(2), None),
            Some("ห้องผ่าตัด 1".to_string())
        );
    }

    #[test]
    fn test_period_filter_and_pm_fallback() {
        let r = resolver();
        let tuesday = NaiveDate::from_ymd_opt(2025, 9, 2).unwrap();
        // 周二 OR3 上午归属 พญ.สุภาภรณ์
        assert_eq!(
            r.resolve("พญ.สุภาภรณ์ พิณพาทย์", tuesday, t(9, 0)),
            Some("ห้องผ่าตัด 3".to_string())
        );
        // 下午 OR3 是牙科医生的台，她无精确归属，兜底到同科室的 OR6
        assert_eq!(
            r.resolve("พญ.สุภาภรณ์ พิณพาทย์", tuesday, t(13, 0)),
            Some("ห้องผ่าตัด 6".to_string())
        );
    }

    #[test]
    fn test_group_entry_resolves_in_table_order() {
        let r = resolver();
        // OBGYN 医生周一同时匹配 OR5/OR6，按表序取 OR5
        assert_eq!(
            r.resolve("พญ.ขวัญตา ทุนประเทือง", monday_of_week(1), t(10, 0)),
            Some("ห้องผ่าตัด 5".to_string())
        );
    }

    #[test]
    fn test_closed_room_never_matches_and_skipped_in_fallback() {
        let r = resolver();
        let wednesday = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        // 周三只有 OR3 关台，颌面外科无归属也无同科室兜底
        assert_eq!(r.resolve("ทพ.ฉลองรัฐ เดชา", wednesday, t(9, 0)), None);
    }

    #[test]
    fn test_unknown_surgeon_is_unassigned() {
        let r = resolver();
        assert_eq!(r.resolve("นพ.ไม่มีในระบบ เลย", monday_of_week(1), None), None);
    }

    #[test]
    fn test_fuzzy_trailing_typo_still_resolves() {
        let r = resolver();
        let tuesday = NaiveDate::from_ymd_opt(2025, 9, 2).unwrap();
        // 录入尾部笔误（ทัย/ไทย）不影响归属
        assert_eq!(
            r.resolve("พญ.สาวิตรี ถนอมวงศ์ทัย", tuesday, None),
            Some("ห้องผ่าตัด 8".to_string())
        );
    }

    #[test]
    fn test_schedule_for_date_display() {
        let r = resolver();
        let wednesday = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        let schedule = r.schedule_for_date(wednesday);
        let or3 = schedule.iter().find(|(room, _)| room == "ห้องผ่าตัด 3").unwrap();
        assert_eq!(or3.1.doctor, "ปิดห้อง");

        let or5 = schedule.iter().find(|(room, _)| room == "ห้องผ่าตัด 5").unwrap();
        assert_eq!(or5.1.doctor, "OBGYN");
        assert_eq!(or5.1.period, "ทั้งวัน");

        let tuesday = NaiveDate::from_ymd_opt(2025, 9, 2).unwrap();
        let schedule = r.schedule_for_date(tuesday);
        let or3 = schedule.iter().find(|(room, _)| room == "ห้องผ่าตัด 3").unwrap();
        assert_eq!(or3.1.period, "เช้า/บ่าย");
    }

    #[test]
    fn test_owner_matches() {
        let r = resolver();
        let monday = monday_of_week(1);
        assert_eq!(
            r.owner_matches("ห้องผ่าตัด 2", monday, Period::Am, "นพ.ณัฐพงศ์ ศรีโพนทอง"),
            Some(true)
        );
        assert_eq!(
            r.owner_matches("ห้องผ่าตัด 2", monday, Period::Am, "พญ.สายฝน บรรณจิตร์"),
            Some(false)
        );
        // 关台房间没有可识别归属
        let wednesday = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        assert_eq!(
            r.owner_matches("ห้องผ่าตัด 3", wednesday, Period::Am, "นพ.สุริยา คุณาชน"),
            None
        );
        // 从未排班的 4 号间同样没有归属
        assert_eq!(
            r.owner_matches("ห้องผ่าตัด 4", monday, Period::Am, "นพ.สุริยา คุณาชน"),
            None
        );
    }
}
