// 内存存储实现
// 用于测试和本地开发，可按存储区域注入故障以验证降级路径

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId};

use super::store::{
    SubscriptionTierRecord, TenantConfigStore, TenantOverrideRecord, TenantRecord, UsageCounterStore, UsageKey,
};
use crate::errors::AccessError;

/// 故障注入开关，置为 true 的区域在访问时返回存储不可用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreFaults {
    pub tenants: bool,
    pub overrides: bool,
    pub usage: bool,
    pub legacy_usage: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tenants: HashMap<TenantId, TenantRecord>,
    tiers: HashMap<Uuid, SubscriptionTierRecord>,
    overrides: Vec<TenantOverrideRecord>,
    usage: HashMap<UsageKey, i64>,
    legacy_usage: HashMap<(TenantId, MonthKey), i64>,
}

/// 内存中的租户配置与用量存储
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    state: RwLock<MemoryState>,
    faults: RwLock<StoreFaults>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn faults(&self) -> StoreFaults {
        *self.faults.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 设置故障注入开关
    pub fn set_faults(&self, faults: StoreFaults) {
        *self.faults.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = faults;
    }

    pub fn upsert_tenant(&self, tenant: TenantRecord) {
        self.write().tenants.insert(tenant.id, tenant);
    }

    pub fn upsert_subscription_tier(&self, tier: SubscriptionTierRecord) {
        self.write().tiers.insert(tier.id, tier);
    }

    /// 追加覆盖项，后加入的同路径覆盖项优先
    pub fn add_override(&self, record: TenantOverrideRecord) {
        self.write().overrides.push(record);
    }

    /// 用量计数行数（每个 (租户, 用户, 功能, 月份) 一行）
    pub fn usage_row_count(&self) -> usize {
        self.read().usage.len()
    }

    /// 旧版汇总计数行数
    pub fn legacy_row_count(&self) -> usize {
        self.read().legacy_usage.len()
    }

    fn check(enabled: bool, store: &str) -> Result<(), AccessError> {
        if enabled {
            Err(AccessError::store_unavailable(store, "注入的存储故障"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TenantConfigStore for InMemoryConfigStore {
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<TenantRecord>, AccessError> {
        Self::check(self.faults().tenants, "tenants")?;
        Ok(self.read().tenants.get(&tenant_id).cloned())
    }

    async fn find_subscription_tier(&self, tier_id: Uuid) -> Result<Option<SubscriptionTierRecord>, AccessError> {
        Self::check(self.faults().tenants, "subscription_tiers")?;
        Ok(self.read().tiers.get(&tier_id).cloned())
    }

    async fn find_active_overrides(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TenantOverrideRecord>, AccessError> {
        Self::check(self.faults().overrides, "tenant_ai_overrides")?;
        Ok(self
            .read()
            .overrides
            .iter()
            .filter(|record| record.tenant_id == tenant_id && record.is_active_at(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UsageCounterStore for InMemoryConfigStore {
    async fn increment_usage(&self, key: &UsageKey) -> Result<i64, AccessError> {
        Self::check(self.faults().usage, "ai_usage_counters")?;
        let mut state = self.write();
        let count = state.usage.entry(*key).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn increment_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError> {
        Self::check(self.faults().legacy_usage, "ai_usage_legacy")?;
        let mut state = self.write();
        let count = state.legacy_usage.entry((tenant_id, month)).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn get_usage(&self, key: &UsageKey) -> Result<i64, AccessError> {
        Self::check(self.faults().usage, "ai_usage_counters")?;
        Ok(self.read().usage.get(key).copied().unwrap_or(0))
    }

    async fn get_tenant_usage(
        &self,
        tenant_id: TenantId,
        month: MonthKey,
    ) -> Result<HashMap<AccessFeatureKey, i64>, AccessError> {
        Self::check(self.faults().usage, "ai_usage_counters")?;
        let mut totals = HashMap::new();
        for (key, count) in self.read().usage.iter() {
            if key.tenant_id == tenant_id && key.month == month {
                *totals.entry(key.feature).or_insert(0) += *count;
            }
        }
        Ok(totals)
    }

    async fn get_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError> {
        Self::check(self.faults().legacy_usage, "ai_usage_legacy")?;
        Ok(self.read().legacy_usage.get(&(tenant_id, month)).copied().unwrap_or(0))
    }
}
