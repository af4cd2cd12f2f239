// 租户 AI 配置解析器
// 解析顺序：系统操作员 → 订阅等级文档 → 旧版套餐 → 租户覆盖项，最后写入缓存

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use ai_access_common::TenantId;

use super::ai_config::TenantAiConfig;
use super::cache::ConfigCache;
use super::merge::{apply_override, deep_merge};
use super::store::{TenantConfigStore, TenantOverrideRecord, TenantRecord};
use super::types::{ConfigSource, PlanTier};

/// 旧版功能开关文档中的字段，逐项读取，类型不符的字段只丢弃自身
struct LegacyFeatureFlags<'a> {
    plan: Option<&'a str>,
    ai_coaching: Option<bool>,
    model: Option<&'a str>,
    max_monthly_uses: Option<i64>,
}

impl<'a> LegacyFeatureFlags<'a> {
    fn read(flags: &'a Value) -> Self {
        let overrides = flags.get("aiOverrides");
        Self {
            plan: flags.get("plan").and_then(Value::as_str),
            ai_coaching: flags.get("aiCoaching").and_then(Value::as_bool),
            model: overrides.and_then(|o| o.get("model")).and_then(Value::as_str),
            max_monthly_uses: overrides
                .and_then(|o| o.get("maxMonthlyUses"))
                .and_then(whole_number),
        }
    }
}

/// 整数，或小数部分为 0 的浮点数
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64)
            .map(|n| n as i64)
    })
}

/// 配置解析器
pub struct ConfigResolver {
    store: Arc<dyn TenantConfigStore>,
    cache: Arc<ConfigCache>,
    system_model: Option<String>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn TenantConfigStore>, cache: Arc<ConfigCache>) -> Self {
        Self {
            store,
            cache,
            system_model: None,
        }
    }

    /// 指定系统操作员使用的模型
    pub fn with_system_model(mut self, model: Option<String>) -> Self {
        self.system_model = model;
        self
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    /// 解析租户配置，优先使用缓存；从不返回错误
    #[instrument(skip(self))]
    pub async fn resolve(&self, tenant_id: Option<TenantId>) -> Arc<TenantAiConfig> {
        let Some(tenant_id) = tenant_id else {
            return Arc::new(self.system_config());
        };

        if let Some(config) = self.cache.get(tenant_id) {
            debug!(tenant_id = %tenant_id, "配置缓存命中");
            return config;
        }

        let config = Arc::new(self.resolve_tenant(tenant_id, Utc::now()).await);
        self.cache.put(tenant_id, config.clone());
        config
    }

    /// 绕过缓存解析，结果不写入缓存
    pub async fn resolve_uncached(&self, tenant_id: Option<TenantId>) -> TenantAiConfig {
        match tenant_id {
            None => self.system_config(),
            Some(tenant_id) => self.resolve_tenant(tenant_id, Utc::now()).await,
        }
    }

    /// 系统操作员：最高等级默认值，不访问存储
    fn system_config(&self) -> TenantAiConfig {
        let mut config = TenantAiConfig::for_plan(PlanTier::highest())
            .with_origin(PlanTier::highest(), ConfigSource::System);
        if let Some(model) = &self.system_model {
            config.model = model.clone();
        }
        config
    }

    async fn resolve_tenant(&self, tenant_id: TenantId, now: DateTime<Utc>) -> TenantAiConfig {
        let base = self.resolve_base(tenant_id).await;
        let config = self.apply_tenant_overrides(tenant_id, base, now).await;

        info!(
            tenant_id = %tenant_id,
            plan = %config.plan,
            source = ?config.source,
            enabled = config.enabled,
            "租户 AI 配置解析完成"
        );
        config
    }

    /// 基础配置：订阅等级文档优先，其次旧版套餐，最后最低等级
    async fn resolve_base(&self, tenant_id: TenantId) -> TenantAiConfig {
        let tenant = match self.store.find_tenant(tenant_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                warn!(tenant_id = %tenant_id, "租户不存在，使用最低等级配置");
                return Self::fallback_config();
            }
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "读取租户失败，使用最低等级配置");
                return Self::fallback_config();
            }
        };

        if let Some(config) = self.resolve_from_subscription_tier(&tenant).await {
            return config;
        }

        Self::resolve_from_legacy_flags(&tenant)
    }

    fn fallback_config() -> TenantAiConfig {
        TenantAiConfig::for_plan(PlanTier::lowest())
            .with_origin(PlanTier::lowest(), ConfigSource::Fallback)
    }

    /// 订阅等级的 AI 配置文档合并到最高等级骨架上，
    /// 使旧文档中缺失的新字段也有默认值
    async fn resolve_from_subscription_tier(&self, tenant: &TenantRecord) -> Option<TenantAiConfig> {
        let tier_id = tenant.subscription_tier_id?;

        let tier = match self.store.find_subscription_tier(tier_id).await {
            Ok(Some(tier)) => tier,
            Ok(None) => {
                warn!(tenant_id = %tenant.id, tier_id = %tier_id, "订阅等级不存在，回退到旧版套餐");
                return None;
            }
            Err(e) => {
                warn!(tenant_id = %tenant.id, error = %e, "读取订阅等级失败，回退到旧版套餐");
                return None;
            }
        };

        let document = tier
            .ai_config
            .as_ref()
            .filter(|doc| doc.as_object().is_some_and(|map| !map.is_empty()))?;

        let skeleton = TenantAiConfig::for_plan(PlanTier::highest());
        let mut merged = match serde_json::to_value(&skeleton) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "序列化默认配置失败");
                return None;
            }
        };
        deep_merge(&mut merged, document);

        match serde_json::from_value::<TenantAiConfig>(merged) {
            Ok(config) => {
                let plan = PlanTier::from_name(&tier.name).unwrap_or_else(PlanTier::lowest);
                debug!(tenant_id = %tenant.id, tier = %tier.name, "使用订阅等级配置");
                Some(config.with_origin(plan, ConfigSource::SubscriptionTier))
            }
            Err(e) => {
                warn!(
                    tenant_id = %tenant.id,
                    tier = %tier.name,
                    error = %e,
                    "订阅等级 AI 配置文档与配置结构不符，回退到旧版套餐"
                );
                None
            }
        }
    }

    /// 旧版路径：套餐名映射到等级默认值，并处理两个旧版开关
    fn resolve_from_legacy_flags(tenant: &TenantRecord) -> TenantAiConfig {
        let flags = LegacyFeatureFlags::read(&tenant.feature_flags);

        let plan = flags.plan.and_then(PlanTier::from_name).unwrap_or_else(PlanTier::lowest);

        let mut config = TenantAiConfig::for_plan(plan).with_origin(plan, ConfigSource::LegacyPlan);

        if flags.ai_coaching == Some(false) {
            config.enabled = false;
        }
        if let Some(max_monthly_uses) = flags.max_monthly_uses {
            config.student_coaching.interactions_per_student_per_month = max_monthly_uses;
        }
        if let Some(model) = flags.model {
            config.model = model.to_string();
        }

        debug!(tenant_id = %tenant.id, plan = %plan, "使用旧版套餐配置");
        config
    }

    /// 应用租户覆盖项；读取失败时原样返回基础配置
    async fn apply_tenant_overrides(
        &self,
        tenant_id: TenantId,
        base: TenantAiConfig,
        now: DateTime<Utc>,
    ) -> TenantAiConfig {
        let overrides = match self.store.find_active_overrides(tenant_id, now).await {
            Ok(overrides) => overrides,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "读取租户覆盖项失败，忽略覆盖项");
                return base;
            }
        };

        if overrides.is_empty() {
            return base;
        }

        Self::apply_overrides(base, &overrides)
    }

    /// 逐条应用覆盖项；未知路径或类型不符的值被跳过
    pub fn apply_overrides(base: TenantAiConfig, overrides: &[TenantOverrideRecord]) -> TenantAiConfig {
        let (plan, source) = (base.plan, base.source);
        let mut current = match serde_json::to_value(&base) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "序列化配置失败，忽略覆盖项");
                return base;
            }
        };
        let mut applied = 0usize;

        for record in overrides {
            let mut candidate = current.clone();
            if !apply_override(&mut candidate, &record.key, &record.value) {
                debug!(key = %record.key, "覆盖项路径未知，已忽略");
                continue;
            }
            if let Err(e) = serde_json::from_value::<TenantAiConfig>(candidate.clone()) {
                warn!(key = %record.key, error = %e, "覆盖项取值类型不符，已忽略");
                continue;
            }
            current = candidate;
            applied += 1;
        }

        match serde_json::from_value::<TenantAiConfig>(current) {
            Ok(config) => {
                debug!(applied, total = overrides.len(), "租户覆盖项已应用");
                config.with_origin(plan, source)
            }
            Err(_) => base,
        }
    }
}
