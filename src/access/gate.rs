// AI 访问网关
// 对外的两个核心操作："能否调用"（check_access）与"已调用"（increment_usage）

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};

use super::ai_config::TenantAiConfig;
use super::cache::ConfigCache;
use super::checker::AccessChecker;
use super::meter::UsageMeter;
use super::resolver::ConfigResolver;
use super::store::{TenantConfigStore, UsageCounterStore};
use super::types::{AccessResult, FeatureUsage, UsageStatus};
use crate::config::AccessConfig;

/// 访问网关：缓存 → 解析 → 检查 → 计量
///
/// 除进程内配置缓存外无其他状态，可在多个进程中各自持有一份，
/// 共享同一个存储。
pub struct AccessGate {
    resolver: ConfigResolver,
    checker: AccessChecker,
    meter: UsageMeter,
}

impl AccessGate {
    pub fn new(
        config_store: Arc<dyn TenantConfigStore>,
        usage_store: Arc<dyn UsageCounterStore>,
        settings: &AccessConfig,
    ) -> Self {
        let cache = Arc::new(ConfigCache::new(settings.cache_ttl()));
        let resolver = ConfigResolver::new(config_store, cache).with_system_model(settings.system_model.clone());

        Self {
            resolver,
            checker: AccessChecker::new(usage_store.clone()),
            meter: UsageMeter::new(usage_store, settings.legacy_counter_enabled),
        }
    }

    /// 使用同时实现两个存储接口的单一存储创建网关
    pub fn from_store<S>(store: Arc<S>, settings: &AccessConfig) -> Self
    where
        S: TenantConfigStore + UsageCounterStore + 'static,
    {
        Self::new(store.clone(), store, settings)
    }

    /// 检查调用者能否使用某个 AI 功能；`tenant_id` 为 None 表示系统操作员
    #[instrument(skip(self))]
    pub async fn check_access(
        &self,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        action: Option<&str>,
    ) -> AccessResult {
        let config = self.resolver.resolve(tenant_id).await;
        self.checker.check(config, tenant_id, user_id, feature, action).await
    }

    /// 在 AI 调用成功后记录用量
    pub async fn increment_usage(&self, tenant_id: Option<TenantId>, user_id: UserId, feature: AccessFeatureKey) {
        self.meter.increment(tenant_id, user_id, feature).await
    }

    /// 单个用户单个功能的本月用量
    pub async fn get_usage_status(
        &self,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
    ) -> UsageStatus {
        let config = self.resolver.resolve(tenant_id).await;
        self.meter.status(&config, tenant_id, user_id, feature).await
    }

    /// 租户各功能本月用量汇总
    pub async fn get_full_usage_status(&self, tenant_id: TenantId) -> BTreeMap<AccessFeatureKey, FeatureUsage> {
        let config = self.resolver.resolve(Some(tenant_id)).await;
        self.meter.full_status(&config, tenant_id).await
    }

    /// 旧版租户月度汇总计数
    pub async fn legacy_monthly_usage(&self, tenant_id: TenantId) -> i64 {
        self.meter.legacy_usage(tenant_id, MonthKey::current()).await
    }

    /// 读取已解析的配置（走缓存）
    pub async fn resolve_config(&self, tenant_id: Option<TenantId>) -> Arc<TenantAiConfig> {
        self.resolver.resolve(tenant_id).await
    }

    /// 清空配置缓存，使新写入的覆盖项立即生效
    pub fn clear_config_cache(&self) {
        self.resolver.cache().clear();
        info!("AI 配置缓存已清空");
    }

    /// 只清除单个租户的缓存条目
    pub fn invalidate_tenant(&self, tenant_id: TenantId) {
        self.resolver.cache().invalidate(tenant_id);
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn checker(&self) -> &AccessChecker {
        &self.checker
    }

    pub fn meter(&self) -> &UsageMeter {
        &self.meter
    }
}
