// 用量计量
// 每个 (租户, 用户, 功能, 月份) 一个原子计数器，另有按 (租户, 月份) 汇总的旧版计数

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};

use super::ai_config::TenantAiConfig;
use super::store::{UsageCounterStore, UsageKey};
use super::types::{FeatureUsage, UsageStatus};

/// 用量计量器
pub struct UsageMeter {
    counters: Arc<dyn UsageCounterStore>,
    legacy_enabled: bool,
}

impl UsageMeter {
    pub fn new(counters: Arc<dyn UsageCounterStore>, legacy_enabled: bool) -> Self {
        Self {
            counters,
            legacy_enabled,
        }
    }

    pub async fn increment(&self, tenant_id: Option<TenantId>, user_id: UserId, feature: AccessFeatureKey) {
        self.increment_for_month(tenant_id, user_id, feature, MonthKey::current())
            .await
    }

    /// 记录一次成功调用；系统操作员不计数，写入失败只记录日志
    #[instrument(skip(self))]
    pub async fn increment_for_month(
        &self,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        month: MonthKey,
    ) {
        let Some(tenant_id) = tenant_id else {
            return;
        };

        let key = UsageKey::new(tenant_id, user_id, feature, month);
        match self.counters.increment_usage(&key).await {
            Ok(count) => debug!(tenant_id = %tenant_id, feature = %feature, count, "用量已记录"),
            Err(e) => warn!(tenant_id = %tenant_id, feature = %feature, error = %e, "记录用量失败"),
        }

        if !self.legacy_enabled {
            return;
        }
        // 旧版汇总独立写入，失败不影响上面的计数
        if let Err(e) = self.counters.increment_legacy_usage(tenant_id, month).await {
            warn!(tenant_id = %tenant_id, error = %e, "记录旧版汇总用量失败");
        }
    }

    pub async fn status(
        &self,
        config: &TenantAiConfig,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
    ) -> UsageStatus {
        self.status_for_month(config, tenant_id, user_id, feature, MonthKey::current())
            .await
    }

    /// 单个用户单个功能的用量；读取失败按 0 计
    pub async fn status_for_month(
        &self,
        config: &TenantAiConfig,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        month: MonthKey,
    ) -> UsageStatus {
        let limit = config.section(feature).monthly_limit();
        let used = match tenant_id {
            None => 0,
            Some(tenant_id) => {
                let key = UsageKey::new(tenant_id, user_id, feature, month);
                self.counters.get_usage(&key).await.unwrap_or_else(|e| {
                    warn!(tenant_id = %tenant_id, feature = %feature, error = %e, "读取用量失败，按 0 处理");
                    0
                })
            }
        };

        UsageStatus::new(feature, used, limit, month.reset_date())
    }

    pub async fn full_status(
        &self,
        config: &TenantAiConfig,
        tenant_id: TenantId,
    ) -> BTreeMap<AccessFeatureKey, FeatureUsage> {
        self.full_status_for_month(config, tenant_id, MonthKey::current())
            .await
    }

    /// 租户各功能本月用量（所有用户之和）
    pub async fn full_status_for_month(
        &self,
        config: &TenantAiConfig,
        tenant_id: TenantId,
        month: MonthKey,
    ) -> BTreeMap<AccessFeatureKey, FeatureUsage> {
        let totals = self
            .counters
            .get_tenant_usage(tenant_id, month)
            .await
            .unwrap_or_else(|e| {
                warn!(tenant_id = %tenant_id, error = %e, "读取租户用量失败，按 0 处理");
                Default::default()
            });

        AccessFeatureKey::ALL
            .iter()
            .map(|feature| {
                let usage = FeatureUsage {
                    used: totals.get(feature).copied().unwrap_or(0),
                    limit: config.section(*feature).monthly_limit(),
                };
                (*feature, usage)
            })
            .collect()
    }

    /// 旧版汇总计数；读取失败按 0 计
    pub async fn legacy_usage(&self, tenant_id: TenantId, month: MonthKey) -> i64 {
        self.counters
            .get_legacy_usage(tenant_id, month)
            .await
            .unwrap_or_else(|e| {
                warn!(tenant_id = %tenant_id, error = %e, "读取旧版汇总用量失败，按 0 处理");
                0
            })
    }
}
