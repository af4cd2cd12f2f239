// 通用类型定义

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::CommonError;

/// 租户 ID 类型
pub type TenantId = Uuid;

/// 用户 ID 类型
pub type UserId = Uuid;

/// AI 功能标识（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessFeatureKey {
    /// 学生辅导
    StudentCoaching,
    /// 项目范围界定
    ProjectScoping,
    /// 作品集分析
    PortfolioIntelligence,
    /// 人才洞察
    TalentInsights,
    /// 机构分析
    InstitutionalAnalytics,
}

impl AccessFeatureKey {
    /// 全部功能，按固定顺序
    pub const ALL: [AccessFeatureKey; 5] = [
        Self::StudentCoaching,
        Self::ProjectScoping,
        Self::PortfolioIntelligence,
        Self::TalentInsights,
        Self::InstitutionalAnalytics,
    ];

    /// 存储层使用的字符串键
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudentCoaching => "student_coaching",
            Self::ProjectScoping => "project_scoping",
            Self::PortfolioIntelligence => "portfolio_intelligence",
            Self::TalentInsights => "talent_insights",
            Self::InstitutionalAnalytics => "institutional_analytics",
        }
    }

    /// 面向用户的功能名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::StudentCoaching => "AI 学生辅导",
            Self::ProjectScoping => "AI 项目范围界定",
            Self::PortfolioIntelligence => "AI 作品集分析",
            Self::TalentInsights => "AI 人才洞察",
            Self::InstitutionalAnalytics => "AI 机构分析",
        }
    }
}

impl fmt::Display for AccessFeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessFeatureKey {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| CommonError::validation(format!("未知的 AI 功能: {}", s)))
    }
}

/// 用量计数的自然月窗口，格式为 `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, CommonError> {
        if !(1..=12).contains(&month) {
            return Err(CommonError::validation(format!("无效的月份: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// 给定时刻所在的月份（UTC）
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// 当前月份
    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 下一个月
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// 本月第一天 00:00 UTC
    pub fn start(&self) -> DateTime<Utc> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN);
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
    }

    /// 计数重置时间：下月第一天 00:00 UTC
    pub fn reset_date(&self) -> DateTime<Utc> {
        self.next().start()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| CommonError::validation(format!("无效的月份键: {}", s)))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| CommonError::validation(format!("无效的年份: {}", year)))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| CommonError::validation(format!("无效的月份: {}", month)))?;
        Self::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
