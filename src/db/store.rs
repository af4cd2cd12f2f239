// 基于数据库的配置与用量存储
// 将仓储层包装成访问控制使用的两个存储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use uuid::Uuid;

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId};

use crate::access::{
    SubscriptionTierRecord, TenantConfigStore, TenantOverrideRecord, TenantRecord, UsageCounterStore, UsageKey,
};
use crate::db::entities::{subscription_tier, tenant, tenant_ai_override};
use crate::db::repositories::{
    SubscriptionTierRepository, TenantAiOverrideRepository, TenantRepository, UsageCounterRepository,
};
use crate::errors::AccessError;

/// 数据库存储
#[derive(Clone)]
pub struct DatabaseConfigStore {
    db: DatabaseConnection,
}

impl DatabaseConfigStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<tenant::Model> for TenantRecord {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            subscription_tier_id: model.subscription_tier_id,
            feature_flags: model.feature_flags,
        }
    }
}

impl From<subscription_tier::Model> for SubscriptionTierRecord {
    fn from(model: subscription_tier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            ai_config: model.ai_config,
        }
    }
}

impl From<tenant_ai_override::Model> for TenantOverrideRecord {
    fn from(model: tenant_ai_override::Model) -> Self {
        Self {
            tenant_id: model.tenant_id,
            key: model.key,
            value: model.value,
            expires_at: model.expires_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

#[async_trait]
impl TenantConfigStore for DatabaseConfigStore {
    async fn find_tenant(&self, tenant_id: TenantId) -> Result<Option<TenantRecord>, AccessError> {
        Ok(TenantRepository::find_by_id(&self.db, tenant_id).await?.map(Into::into))
    }

    async fn find_subscription_tier(&self, tier_id: Uuid) -> Result<Option<SubscriptionTierRecord>, AccessError> {
        Ok(SubscriptionTierRepository::find_by_id(&self.db, tier_id)
            .await?
            .map(Into::into))
    }

    async fn find_active_overrides(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TenantOverrideRecord>, AccessError> {
        Ok(TenantAiOverrideRepository::find_active(&self.db, tenant_id, now)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

#[async_trait]
impl UsageCounterStore for DatabaseConfigStore {
    async fn increment_usage(&self, key: &UsageKey) -> Result<i64, AccessError> {
        UsageCounterRepository::increment(&self.db, key.tenant_id, key.user_id, key.feature, key.month).await
    }

    async fn increment_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError> {
        UsageCounterRepository::increment_legacy(&self.db, tenant_id, month).await
    }

    async fn get_usage(&self, key: &UsageKey) -> Result<i64, AccessError> {
        UsageCounterRepository::get(&self.db, key.tenant_id, key.user_id, key.feature, key.month).await
    }

    async fn get_tenant_usage(
        &self,
        tenant_id: TenantId,
        month: MonthKey,
    ) -> Result<HashMap<AccessFeatureKey, i64>, AccessError> {
        UsageCounterRepository::sum_by_feature(&self.db, tenant_id, month).await
    }

    async fn get_legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> Result<i64, AccessError> {
        UsageCounterRepository::get_legacy(&self.db, tenant_id, month).await
    }
}
