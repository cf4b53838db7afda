//! 日历工具函数
//!
//! 周排班表用"当月第几周"选择生效条目，这里保持看板原有算法不变。

use chrono::{Datelike, NaiveDate, Weekday};

/// 计算日期落在当月第几周（1 起始）
///
/// 公式为 `ceil((日号 + 当月 1 日的周日序) / 7)`。月底可能得到 5 或 6，
/// 排班条目只登记第 1-4 周时，这类日期不会命中任何条目。
pub fn week_of_month(date: NaiveDate) -> u8 {
    let first_day = date.with_day(1).unwrap_or(date);
    // Sunday=0 .. Saturday=6
    let first_weekday = first_day.weekday().num_days_from_sunday();
    let day_of_month = date.day();
    ((day_of_month + first_weekday).div_ceil(7)) as u8
}

/// 工作日序号：Mon=0 .. Fri=4，周末返回 None（周末没有排班房间）
pub fn weekday_index(date: NaiveDate) -> Option<usize> {
    match date.weekday() {
        Weekday::Mon => Some(0),
        Weekday::Tue => Some(1),
        Weekday::Wed => Some(2),
        Weekday::Thu => Some(3),
        Weekday::Fri => Some(4),
        Weekday::Sat | Weekday::Sun => None,
    }
}
