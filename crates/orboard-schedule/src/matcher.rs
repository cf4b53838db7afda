//! 姓名匹配器
//!
//! 医生姓名来自人工录入与 Excel 导入，尾部笔误常见。匹配策略：
//! 归一化后全等，或较短者前 80% 字符全等（仅容忍尾部笔误，
//! 开头不一致一律视为不同人）。

use crate::plan::DoctorSpec;
use crate::roster::Roster;
use std::sync::Arc;

/// 姓名匹配器
///
/// 持有花名册的只读引用，全部方法无副作用，可并发调用。
#[derive(Debug, Clone)]
pub struct NameMatcher {
    roster: Arc<Roster>,
}

impl NameMatcher {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// 归一化：去除全部空白、小写化，并修正已知的尾部转写变体
    pub fn normalize(name: &str) -> String {
        let mut s: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        // 常见尾部笔误：ทัย -> ไทย
        if let Some(stem) = s.strip_suffix("ทัย") {
            s = format!("{stem}ไทย");
        }
        // 尾部变体：ศักดิ์ -> ศักดิ
        if let Some(stem) = s.strip_suffix("ศักดิ์") {
            s = format!("{stem}ศักดิ");
        }
        s
    }

    /// 容错比对：全等，或前 80% 字符（按较短归一化长度计，阈值须超过 5 字）相等
    pub fn fuzzy_match(candidate: &str, target: &str) -> bool {
        let a = Self::normalize(candidate);
        let b = Self::normalize(target);
        if a == b {
            return true;
        }

        let ca: Vec<char> = a.chars().collect();
        let cb: Vec<char> = b.chars().collect();
        let min_len = ca.len().min(cb.len());
        let check_len = min_len * 8 / 10;
        check_len > 5 && ca[..check_len] == cb[..check_len]
    }

    /// 医生是否命中排班条目的医生声明（单人 / 联台名单 / 分组）
    ///
    /// CLOSED 永不命中；未知分组按未登记处理（失败安全，不中断解析）。
    pub fn matches_spec(&self, surgeon: &str, spec: &DoctorSpec) -> bool {
        match spec {
            DoctorSpec::Single(name) => Self::fuzzy_match(surgeon, name),
            DoctorSpec::Team(names) => names.iter().any(|n| Self::fuzzy_match(surgeon, n)),
            DoctorSpec::Group(alias) => match self.roster.expand_group(alias) {
                Ok(members) => members.iter().any(|n| Self::fuzzy_match(surgeon, n)),
                Err(_) => {
                    tracing::warn!("Unknown doctor group {} in weekly plan, entry skipped", alias);
                    false
                }
            },
            DoctorSpec::Closed => false,
        }
    }

    /// 按花名册顺序线性扫描，用容错比对找医生所属科室
    ///
    /// 仅作兜底键使用，不作身份判定。
    pub fn department_of(&self, surgeon: &str) -> Option<String> {
        for dept in self.roster.departments() {
            if dept.surgeons.iter().any(|n| Self::fuzzy_match(surgeon, n)) {
                return Some(dept.id.clone());
            }
        }
        None
    }
}
