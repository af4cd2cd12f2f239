// 租户配置存储与用量计数存储接口
// 访问控制只读取这些记录，不负责它们的生命周期

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};

use crate::errors::AccessError;

/// 租户记录中与 AI 相关的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: TenantId,
    pub subscription_tier_id: Option<Uuid>,
    /// 旧版功能开关文档（`plan`、`aiCoaching`、`aiOverrides`）
    pub feature_flags: Value,
}

/// 订阅等级模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTierRecord {
    pub id: Uuid,
    pub name: String,
    pub ai_config: Option<Value>,
}

/// 租户覆盖项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantOverrideRecord {
    pub tenant_id: TenantId,
    /// 点分路径，例如 `studentCoaching.interactionsPerStudentPerMonth`
    pub key: String,
    pub value: Value,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TenantOverrideRecord {
    /// 在给定时刻是否仍然有效
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// 用量计数键：(租户, 用户, 功能, 月份)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageKey {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub feature: AccessFeatureKey,
    pub month: MonthKey,
}

impl UsageKey {
    pub fn new(tenant_id: TenantId, user_id: UserId, feature: AccessFeatureKey, month: MonthKey) -> Self {
        Self {
            tenant_id,
            user_id,
            feature,
            month,
        }
    }
}

/// 租户配置存储
#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    /// 查找租户
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<TenantRecord>, AccessError>;

    /// 查找订阅等级
    async fn find_subscription_tier(&self, tier_id: Uuid) -> Result<Option<SubscriptionTierRecord>, AccessError>;

    /// 查找租户在给定时刻仍有效的覆盖项，按创建顺序返回
    async fn find_active_overrides(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TenantOverrideRecord>, AccessError>;
}

/// 用量计数存储
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    /// 原子地对计数加一（不存在时以 1 创建），返回新值
    async fn increment_usage(&self, key: &UsageKey) -> Result<i64, AccessError>;

    /// 原子地对旧版 (租户, 月份) 汇总计数加一，返回新值
    async fn increment_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError>;

    /// 读取单个计数，不存在时为 0
    async fn get_usage(&self, key: &UsageKey) -> Result<i64, AccessError>;

    /// 租户某月各功能的用量（所有用户之和）
    async fn get_tenant_usage(
        &self,
        tenant_id: TenantId,
        month: MonthKey,
    ) -> Result<HashMap<AccessFeatureKey, i64>, AccessError>;

    /// 读取旧版汇总计数，不存在时为 0
    async fn get_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError>;
}
