// 访问检查
// 按固定顺序依次检查：全局开关 → 功能开关 → 操作白名单 → 月度额度

use std::sync::Arc;
use tracing::{info, instrument, warn};

use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};

use super::ai_config::TenantAiConfig;
use super::store::{UsageCounterStore, UsageKey};
use super::types::{AccessDenial, AccessResult, DenialReason, is_unlimited};

/// 访问检查器
pub struct AccessChecker {
    counters: Arc<dyn UsageCounterStore>,
}

impl AccessChecker {
    pub fn new(counters: Arc<dyn UsageCounterStore>) -> Self {
        Self { counters }
    }

    /// 按当前月份检查
    pub async fn check(
        &self,
        config: Arc<TenantAiConfig>,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        action: Option<&str>,
    ) -> AccessResult {
        self.check_for_month(config, tenant_id, user_id, feature, action, MonthKey::current())
            .await
    }

    /// 按指定月份检查
    #[instrument(skip(self, config), fields(plan = %config.plan))]
    pub async fn check_for_month(
        &self,
        config: Arc<TenantAiConfig>,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        action: Option<&str>,
        month: MonthKey,
    ) -> AccessResult {
        let plan = config.plan;

        // 系统操作员不受任何限制
        let Some(tenant_id) = tenant_id else {
            return AccessResult::allow(config);
        };

        if !config.enabled {
            let denial = AccessDenial::new(DenialReason::AiDisabled, "该机构已停用 AI 功能", None);
            return Self::deny(config, denial, tenant_id, feature);
        }

        let section = config.section(feature);

        if !section.enabled() {
            let denial = AccessDenial::new(
                DenialReason::FeatureDisabled,
                format!("当前订阅等级未开通{}", feature.display_name()),
                Some(plan),
            );
            return Self::deny(config, denial, tenant_id, feature);
        }

        if let (Some(action), Some(allowed)) = (action, section.allowed_actions()) {
            if !allowed.iter().any(|candidate| candidate == action) {
                let denial = AccessDenial::new(
                    DenialReason::ActionNotAvailable,
                    format!("当前订阅等级不支持操作“{}”", action),
                    Some(plan),
                );
                return Self::deny(config, denial, tenant_id, feature);
            }
        }

        let limit = section.monthly_limit();
        if is_unlimited(limit) {
            return AccessResult::allow(config);
        }

        let used = self.read_usage(&UsageKey::new(tenant_id, user_id, feature, month)).await;
        if used >= limit {
            let denial = AccessDenial::new(
                DenialReason::MonthlyLimitReached,
                format!("本月{}次数已用完（{}/{}）", feature.display_name(), used, limit),
                Some(plan),
            )
            .with_reset_date(month.reset_date());
            return Self::deny(config, denial, tenant_id, feature);
        }

        AccessResult::allow(config)
    }

    /// 读取失败时按 0 计，不阻断请求
    async fn read_usage(&self, key: &UsageKey) -> i64 {
        match self.counters.get_usage(key).await {
            Ok(used) => used,
            Err(e) => {
                warn!(
                    tenant_id = %key.tenant_id,
                    feature = %key.feature,
                    error = %e,
                    "读取用量失败，按 0 处理"
                );
                0
            }
        }
    }

    fn deny(
        config: Arc<TenantAiConfig>,
        denial: AccessDenial,
        tenant_id: TenantId,
        feature: AccessFeatureKey,
    ) -> AccessResult {
        info!(
            tenant_id = %tenant_id,
            feature = %feature,
            reason = %denial.reason,
            upgrade_available = denial.upgrade_available,
            "AI 访问被拒绝"
        );
        AccessResult::deny(config, denial)
    }
}
