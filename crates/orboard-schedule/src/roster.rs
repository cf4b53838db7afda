//! 医生花名册
//!
//! 科室与主刀医生的唯一权威名单。分组别名（如 OBGYN_ANY）一律指向科室，
//! 展开时读取花名册本身，杜绝手工复制名单造成的不一致。

use orboard_core::{OrBoardError, Result};
use serde::{Deserialize, Serialize};

/// 科室
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,            // 科室标识（英文）
    pub name: String,          // 展示名（英文 | 泰文）
    pub surgeons: Vec<String>, // 本科室主刀医生名单
}

/// 医生花名册
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    departments: Vec<Department>,
    /// 分组别名 -> 科室标识
    groups: Vec<(String, String)>,
}

impl Roster {
    pub fn new(departments: Vec<Department>, groups: Vec<(String, String)>) -> Self {
        Self { departments, groups }
    }

    /// 默认院区配置（沿用看板现行名单）
    pub fn default_hospital() -> Self {
        let departments = vec![
            Department {
                id: "Surgery".to_string(),
                name: "Surgery | ศัลยกรรมทั่วไป".to_string(),
                surgeons: vec![
                    "นพ.สุริยา คุณาชน".to_string(),
                    "นพ.ธนวัฒน์ พันธุ์พรหม".to_string(),
                    "พญ.สุภาภรณ์ พิณพาทย์".to_string(),
                    "พญ.รัฐพร ตั้งเพียร".to_string(),
                    "นพ.พิชัย สุวัฒนพูนลาภ".to_string(),
                ],
            },
            Department {
                id: "Orthopedics".to_string(),
                name: "Orthopedics | ศัลยกรรมกระดูกและข้อ".to_string(),
                surgeons: vec![
                    "นพ.ชัชพล องค์โฆษิต".to_string(),
                    "นพ.ณัฐพงศ์ ศรีโพนทอง".to_string(),
                    "นพ.อำนาจ อนันต์วัฒนกุล".to_string(),
                    "นพ.อภิชาติ ลักษณะ".to_string(),
                    "นพ.กฤษฎา อิ้งอำพร".to_string(),
                    "นพ.วิษณุ ผูกพันธ์".to_string(),
                ],
            },
            Department {
                id: "Urology".to_string(),
                name: "Urology | ศัลยกรรมระบบทางเดินปัสสาวะ".to_string(),
                surgeons: vec!["พญ.สายฝน บรรณจิตร์".to_string()],
            },
            Department {
                id: "ENT".to_string(),
                name: "ENT | ศัลยกรรม โสต ศอ นาสิก".to_string(),
                surgeons: vec![
                    "พญ.พิรุณยา แสนวันดี".to_string(),
                    "พญ.สุทธิพร หมวดไธสง".to_string(),
                    "นพ.วรวิช พลเวียงธรรม".to_string(),
                ],
            },
            Department {
                id: "OBGYN".to_string(),
                name: "Obstetrics-Gynecology | สูติ-นรีเวช".to_string(),
                surgeons: vec![
                    "นพ.สุรจิตต์ นิมิตรวงษ์สกุล".to_string(),
                    "พญ.ขวัญตา ทุนประเทือง".to_string(),
                    "พญ.วัชราภรณ์ อนวัชชกุล".to_string(),
                    "พญ.รุ่งฤดี โขมพัตร".to_string(),
                    "พญ.ฐิติมน ชัยชนะทรัพย์".to_string(),
                ],
            },
            Department {
                id: "Ophthalmology".to_string(),
                name: "Ophthalmology | จักษุ".to_string(),
                surgeons: vec![
                    "นพ.สราวุธ สารีย์".to_string(),
                    "พญ.ดวิษา อังศรีประเสริฐ".to_string(),
                    "พญ.สาวิตรี ถนอมวงศ์ไทย".to_string(),
                    "พญ.สีชมพู ตั้งสัตยาธิษฐาน".to_string(),
                    "พญ.นันท์นภัส ชีวะเกรียงไกร".to_string(),
                ],
            },
            Department {
                id: "Maxillofacial".to_string(),
                name: "Maxillofacial | ศัลยกรรมขากรรไกร".to_string(),
                surgeons: vec![
                    "ทพ.ฉลองรัฐ เดชา".to_string(),
                    "ทพญ.อรุณนภา คิสารัง".to_string(),
                ],
            },
        ];

        let groups = vec![
            ("SUR_ANY".to_string(), "Surgery".to_string()),
            ("ORTHO_ANY".to_string(), "Orthopedics".to_string()),
            ("URO_ANY".to_string(), "Urology".to_string()),
            ("ENT_ANY".to_string(), "ENT".to_string()),
            ("OBGYN_ANY".to_string(), "OBGYN".to_string()),
            ("EYE_ANY".to_string(), "Ophthalmology".to_string()),
            ("MAXILO_ANY".to_string(), "Maxillofacial".to_string()),
        ];

        Self::new(departments, groups)
    }

    /// 查科室（声明顺序遍历）
    pub fn department(&self, id: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == id)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    /// 展开分组别名为医生名单；未知别名属于调用错误
    pub fn expand_group(&self, alias: &str) -> Result<&[String]> {
        let dept_id = self
            .groups
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, d)| d.as_str())
            .ok_or_else(|| OrBoardError::UnknownGroup(alias.to_string()))?;
        let dept = self
            .department(dept_id)
            .ok_or_else(|| OrBoardError::UnknownGroup(alias.to_string()))?;
        Ok(&dept.surgeons)
    }

    /// 判断名字是否形如分组别名
    pub fn is_group_alias(&self, name: &str) -> bool {
        self.groups.iter().any(|(a, _)| a == name)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::default_hospital()
    }
}
