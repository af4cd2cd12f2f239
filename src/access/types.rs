// 访问控制结果与等级类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use ai_access_common::AccessFeatureKey;

use super::ai_config::TenantAiConfig;

/// 月度次数上限的“不限量”哨兵值
pub const UNLIMITED: i64 = -1;

/// 判断月度上限是否为不限量
pub fn is_unlimited(limit: i64) -> bool {
    limit == UNLIMITED
}

/// 订阅等级（固定升级路径：starter → professional → enterprise）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// 入门版
    #[default]
    Starter,
    /// 专业版
    Professional,
    /// 企业版
    Enterprise,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [Self::Starter, Self::Professional, Self::Enterprise];

    pub fn lowest() -> Self {
        Self::Starter
    }

    pub fn highest() -> Self {
        Self::Enterprise
    }

    /// 存储和配置中使用的等级名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// 面向用户的等级名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Starter => "Starter",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
        }
    }

    /// 下一个可升级的等级，最高等级返回 None
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Starter => Some(Self::Professional),
            Self::Professional => Some(Self::Enterprise),
            Self::Enterprise => None,
        }
    }

    /// 按名称匹配等级，大小写不敏感，兼容旧版套餐别名
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "starter" | "free" | "basic" | "entry" => Some(Self::Starter),
            "professional" | "pro" | "growth" => Some(Self::Professional),
            "enterprise" | "premium" | "unlimited" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已解析配置的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// 系统操作员（无租户）
    System,
    /// 订阅等级上的 AI 配置文档
    SubscriptionTier,
    /// 旧版功能开关中的套餐名称
    LegacyPlan,
    /// 租户不存在或读取失败时的最低等级默认值
    #[default]
    Fallback,
}

/// 拒绝原因（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// 租户整体关闭了 AI
    AiDisabled,
    /// 当前等级未开通该功能
    FeatureDisabled,
    /// 当前等级不支持该操作
    ActionNotAvailable,
    /// 本月次数已用完
    MonthlyLimitReached,
    /// 预留：短时限流，目前不会产生
    RateLimited,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiDisabled => "ai_disabled",
            Self::FeatureDisabled => "feature_disabled",
            Self::ActionNotAvailable => "action_not_available",
            Self::MonthlyLimitReached => "monthly_limit_reached",
            Self::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化拒绝信息，供客户端展示升级提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDenial {
    pub reason: DenialReason,
    pub message: String,
    pub upgrade_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_tier_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_date: Option<DateTime<Utc>>,
}

impl AccessDenial {
    /// 创建拒绝信息，并按当前等级附带升级提示
    pub fn new(reason: DenialReason, message: impl Into<String>, upgrade_from: Option<PlanTier>) -> Self {
        let next = upgrade_from.and_then(|plan| plan.next());
        Self {
            reason,
            message: message.into(),
            upgrade_available: next.is_some(),
            upgrade_tier_name: next.map(|plan| plan.display_name().to_string()),
            reset_date: None,
        }
    }

    pub fn with_reset_date(mut self, reset_date: DateTime<Utc>) -> Self {
        self.reset_date = Some(reset_date);
        self
    }
}

/// 访问检查结果（不持久化）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResult {
    pub allowed: bool,
    pub config: Arc<TenantAiConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<AccessDenial>,
}

impl AccessResult {
    pub fn allow(config: Arc<TenantAiConfig>) -> Self {
        Self {
            allowed: true,
            config,
            denial: None,
        }
    }

    pub fn deny(config: Arc<TenantAiConfig>, denial: AccessDenial) -> Self {
        Self {
            allowed: false,
            config,
            denial: Some(denial),
        }
    }

    /// 拒绝原因，允许时为 None
    pub fn reason(&self) -> Option<DenialReason> {
        self.denial.as_ref().map(|denial| denial.reason)
    }
}

/// 单个用户单个功能的本月用量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    pub feature: AccessFeatureKey,
    pub used: i64,
    pub limit: i64,
    /// 不限量时为 -1
    pub remaining: i64,
    pub reset_date: DateTime<Utc>,
    pub usage_percentage: f64,
}

impl UsageStatus {
    pub fn new(feature: AccessFeatureKey, used: i64, limit: i64, reset_date: DateTime<Utc>) -> Self {
        let (remaining, usage_percentage) = if is_unlimited(limit) {
            (UNLIMITED, 0.0)
        } else if limit <= 0 {
            (0, 100.0)
        } else {
            ((limit - used).max(0), used as f64 / limit as f64 * 100.0)
        };

        Self {
            feature,
            used,
            limit,
            remaining,
            reset_date,
            usage_percentage,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        !is_unlimited(self.limit) && self.used >= self.limit
    }
}

/// 租户级功能用量汇总（所有用户之和）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUsage {
    pub used: i64,
    pub limit: i64,
}
