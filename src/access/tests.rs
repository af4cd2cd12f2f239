// 访问控制测试

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};

    use crate::access::*;
    use crate::config::AccessConfig;
    use crate::errors::AccessError;

    const COACHING_LIMIT_KEY: &str = "studentCoaching.interactionsPerStudentPerMonth";

    fn tier_document(plan: PlanTier) -> Value {
        serde_json::to_value(TenantAiConfig::for_plan(plan)).unwrap()
    }

    /// 创建挂在订阅等级上的租户
    fn tenant_on_tier(store: &InMemoryConfigStore, tier_name: &str, ai_config: Option<Value>) -> TenantId {
        let tier_id = Uuid::new_v4();
        store.upsert_subscription_tier(SubscriptionTierRecord {
            id: tier_id,
            name: tier_name.to_string(),
            ai_config,
        });

        let tenant_id = Uuid::new_v4();
        store.upsert_tenant(TenantRecord {
            id: tenant_id,
            subscription_tier_id: Some(tier_id),
            feature_flags: json!({}),
        });
        tenant_id
    }

    /// 创建只有旧版功能开关的租户
    fn legacy_tenant(store: &InMemoryConfigStore, feature_flags: Value) -> TenantId {
        let tenant_id = Uuid::new_v4();
        store.upsert_tenant(TenantRecord {
            id: tenant_id,
            subscription_tier_id: None,
            feature_flags,
        });
        tenant_id
    }

    fn override_record(tenant_id: TenantId, key: &str, value: Value) -> TenantOverrideRecord {
        TenantOverrideRecord {
            tenant_id,
            key: key.to_string(),
            value,
            expires_at: None,
        }
    }

    fn gate_with(store: &Arc<InMemoryConfigStore>) -> AccessGate {
        AccessGate::from_store(store.clone(), &AccessConfig::default())
    }

    /// 固定返回某个用量的计数存储
    struct FixedUsage(i64);

    #[async_trait]
    impl UsageCounterStore for FixedUsage {
        async fn increment_usage(&self, _key: &UsageKey) -> Result<i64, AccessError> {
            Ok(self.0 + 1)
        }

        async fn increment_legacy_usage(&self, _tenant_id: TenantId, _month: MonthKey) -> Result<i64, AccessError> {
            Ok(self.0 + 1)
        }

        async fn get_usage(&self, _key: &UsageKey) -> Result<i64, AccessError> {
            Ok(self.0)
        }

        async fn get_tenant_usage(
            &self,
            _tenant_id: TenantId,
            _month: MonthKey,
        ) -> Result<HashMap<AccessFeatureKey, i64>, AccessError> {
            Ok(AccessFeatureKey::ALL.iter().map(|feature| (*feature, self.0)).collect())
        }

        async fn get_legacy_usage(&self, _tenant_id: TenantId, _month: MonthKey) -> Result<i64, AccessError> {
            Ok(self.0)
        }
    }

    // ---- 配置解析 ----

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        store.add_override(override_record(tenant_id, "model", json!("gpt-4.1")));
        let gate = gate_with(&store);

        let first = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        let second = gate.resolver().resolve_uncached(Some(tenant_id)).await;

        assert_eq!(first, second);
        assert_eq!(first.model, "gpt-4.1");
        assert_eq!(first.plan, PlanTier::Professional);
        assert_eq!(first.source, ConfigSource::SubscriptionTier);
    }

    #[tokio::test]
    async fn test_override_leaves_siblings_intact() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let gate = gate_with(&store);

        let before = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(before.student_coaching.interactions_per_student_per_month, 50);

        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!(5)));
        let after = gate.resolver().resolve_uncached(Some(tenant_id)).await;

        assert_eq!(after.student_coaching.interactions_per_student_per_month, 5);
        assert_eq!(
            after.student_coaching.allowed_quick_actions,
            before.student_coaching.allowed_quick_actions
        );
        assert_eq!(
            after.student_coaching.conversation_memory,
            before.student_coaching.conversation_memory
        );
        assert_eq!(after.project_scoping, before.project_scoping);
        assert_eq!(after.model, before.model);
    }

    #[tokio::test]
    async fn test_section_override_merges_into_section() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "starter", Some(tier_document(PlanTier::Starter)));
        store.add_override(override_record(
            tenant_id,
            "talentInsights",
            json!({ "enabled": true, "queriesPerMonth": 3 }),
        ));
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert!(config.talent_insights.enabled);
        assert_eq!(config.talent_insights.queries_per_month, 3);
        assert_eq!(
            config.talent_insights.max_candidates_per_query,
            TenantAiConfig::for_plan(PlanTier::Starter).talent_insights.max_candidates_per_query
        );
    }

    #[tokio::test]
    async fn test_later_override_wins_and_bad_values_are_skipped() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!(20)));
        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!("many")));
        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!(30)));
        store.add_override(override_record(tenant_id, "imageGeneration.enabled", json!(true)));
        store.add_override(override_record(tenant_id, "plan", json!("enterprise")));
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.student_coaching.interactions_per_student_per_month, 30);
        assert_eq!(config.plan, PlanTier::Professional);
    }

    #[tokio::test]
    async fn test_expired_overrides_are_ignored() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        store.add_override(TenantOverrideRecord {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..override_record(tenant_id, COACHING_LIMIT_KEY, json!(1))
        });
        store.add_override(TenantOverrideRecord {
            expires_at: Some(Utc::now() + Duration::hours(1)),
            ..override_record(tenant_id, "model", json!("gpt-4o"))
        });
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.student_coaching.interactions_per_student_per_month, 50);
        assert_eq!(config.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_partial_tier_document_merges_onto_highest_defaults() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(
            &store,
            "Custom University",
            Some(json!({ "studentCoaching": { "interactionsPerStudentPerMonth": 7 } })),
        );
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        let enterprise = TenantAiConfig::for_plan(PlanTier::Enterprise);

        assert_eq!(config.student_coaching.interactions_per_student_per_month, 7);
        assert_eq!(config.talent_insights, enterprise.talent_insights);
        assert_eq!(config.source, ConfigSource::SubscriptionTier);
        // 未知等级名按最低等级给出升级提示
        assert_eq!(config.plan, PlanTier::Starter);
    }

    #[tokio::test]
    async fn test_mismatched_tier_document_falls_back_to_legacy_plan() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tier_id = Uuid::new_v4();
        store.upsert_subscription_tier(SubscriptionTierRecord {
            id: tier_id,
            name: "enterprise".to_string(),
            ai_config: Some(json!({ "maxTokens": "lots" })),
        });
        let tenant_id = Uuid::new_v4();
        store.upsert_tenant(TenantRecord {
            id: tenant_id,
            subscription_tier_id: Some(tier_id),
            feature_flags: json!({ "plan": "professional" }),
        });
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.source, ConfigSource::LegacyPlan);
        assert_eq!(config.plan, PlanTier::Professional);
    }

    #[tokio::test]
    async fn test_empty_tier_document_uses_legacy_plan() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tier_id = Uuid::new_v4();
        store.upsert_subscription_tier(SubscriptionTierRecord {
            id: tier_id,
            name: "enterprise".to_string(),
            ai_config: Some(json!({})),
        });
        let tenant_id = Uuid::new_v4();
        store.upsert_tenant(TenantRecord {
            id: tenant_id,
            subscription_tier_id: Some(tier_id),
            feature_flags: json!({ "plan": "pro" }),
        });
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.source, ConfigSource::LegacyPlan);
        assert_eq!(config.plan, PlanTier::Professional);
    }

    #[tokio::test]
    async fn test_legacy_flags_translation() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(
            &store,
            json!({
                "plan": "starter",
                "aiOverrides": { "model": "gpt-4o", "maxMonthlyUses": 3 }
            }),
        );
        let disabled_id = legacy_tenant(&store, json!({ "plan": "enterprise", "aiCoaching": false }));
        let garbage_id = legacy_tenant(&store, json!("not an object"));
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.student_coaching.interactions_per_student_per_month, 3);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.source, ConfigSource::LegacyPlan);

        let disabled = gate.resolver().resolve_uncached(Some(disabled_id)).await;
        assert!(!disabled.enabled);
        assert_eq!(disabled.plan, PlanTier::Enterprise);

        let garbage = gate.resolver().resolve_uncached(Some(garbage_id)).await;
        assert_eq!(garbage.plan, PlanTier::Starter);
        assert!(garbage.enabled);
    }

    #[tokio::test]
    async fn test_legacy_flags_read_independently() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(
            &store,
            json!({
                "plan": "professional",
                "aiCoaching": false,
                "aiOverrides": { "model": "gpt-4.1", "maxMonthlyUses": "25" }
            }),
        );
        let float_id = legacy_tenant(
            &store,
            json!({ "plan": 3, "aiOverrides": { "model": 7, "maxMonthlyUses": 25.0 } }),
        );
        let gate = gate_with(&store);

        // 类型错误的字段只丢弃自身
        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert!(!config.enabled);
        assert_eq!(config.plan, PlanTier::Professional);
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(
            config.student_coaching.interactions_per_student_per_month,
            TenantAiConfig::for_plan(PlanTier::Professional)
                .student_coaching
                .interactions_per_student_per_month
        );

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None)
            .await;
        assert_eq!(result.reason(), Some(DenialReason::AiDisabled));

        let float = gate.resolver().resolve_uncached(Some(float_id)).await;
        assert_eq!(float.plan, PlanTier::Starter);
        assert!(float.enabled);
        assert_eq!(float.model, TenantAiConfig::for_plan(PlanTier::Starter).model);
        assert_eq!(float.student_coaching.interactions_per_student_per_month, 25);
    }

    #[tokio::test]
    async fn test_missing_tenant_gets_lowest_tier() {
        let store = Arc::new(InMemoryConfigStore::new());
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(Uuid::new_v4())).await;
        assert_eq!(config.plan, PlanTier::Starter);
        assert_eq!(config.source, ConfigSource::Fallback);
        assert_eq!(
            config.student_coaching,
            TenantAiConfig::for_plan(PlanTier::Starter).student_coaching
        );
    }

    // ---- 缓存 ----

    #[tokio::test]
    async fn test_cache_staleness_until_cleared() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let gate = gate_with(&store);

        let cached = gate.resolve_config(Some(tenant_id)).await;
        assert_eq!(cached.student_coaching.interactions_per_student_per_month, 50);

        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!(5)));
        let stale = gate.resolve_config(Some(tenant_id)).await;
        assert_eq!(stale.student_coaching.interactions_per_student_per_month, 50);

        gate.clear_config_cache();
        let fresh = gate.resolve_config(Some(tenant_id)).await;
        assert_eq!(fresh.student_coaching.interactions_per_student_per_month, 5);
    }

    #[tokio::test]
    async fn test_invalidate_single_tenant() {
        let store = Arc::new(InMemoryConfigStore::new());
        let first = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let second = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let gate = gate_with(&store);

        gate.resolve_config(Some(first)).await;
        gate.resolve_config(Some(second)).await;
        assert_eq!(gate.resolver().cache().len(), 2);

        gate.invalidate_tenant(first);
        assert_eq!(gate.resolver().cache().len(), 1);
    }

    #[tokio::test]
    async fn test_system_operator_is_not_cached() {
        let store = Arc::new(InMemoryConfigStore::new());
        let settings = AccessConfig {
            system_model: Some("gpt-4o".to_string()),
            ..AccessConfig::default()
        };
        let gate = AccessGate::from_store(store.clone(), &settings);

        let config = gate.resolve_config(None).await;
        assert_eq!(config.source, ConfigSource::System);
        assert_eq!(config.plan, PlanTier::Enterprise);
        assert_eq!(config.model, "gpt-4o");
        assert!(gate.resolver().cache().is_empty());
    }

    // ---- 访问检查 ----

    #[tokio::test]
    async fn test_unlimited_never_denies() {
        let config = Arc::new(TenantAiConfig::for_plan(PlanTier::Enterprise));
        let tenant_id = Some(Uuid::new_v4());

        for used in [0, 1_000, 1_000_000] {
            let checker = AccessChecker::new(Arc::new(FixedUsage(used)));
            for feature in AccessFeatureKey::ALL {
                let result = checker.check(config.clone(), tenant_id, Uuid::new_v4(), feature, None).await;
                assert!(result.allowed, "{feature} denied at usage {used}");
            }
        }
    }

    #[tokio::test]
    async fn test_quota_boundary() {
        let config = Arc::new(TenantAiConfig::for_plan(PlanTier::Starter));
        assert_eq!(config.student_coaching.interactions_per_student_per_month, 10);
        let tenant_id = Some(Uuid::new_v4());

        let under = AccessChecker::new(Arc::new(FixedUsage(9)));
        let result = under
            .check(config.clone(), tenant_id, Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None)
            .await;
        assert!(result.allowed);

        let at_limit = AccessChecker::new(Arc::new(FixedUsage(10)));
        let month = MonthKey::new(2026, 3).unwrap();
        let result = at_limit
            .check_for_month(config, tenant_id, Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None, month)
            .await;
        assert!(!result.allowed);

        let denial = result.denial.unwrap();
        assert_eq!(denial.reason, DenialReason::MonthlyLimitReached);
        assert_eq!(denial.reset_date, Some(MonthKey::new(2026, 4).unwrap().start()));
        assert_eq!(denial.upgrade_tier_name.as_deref(), Some("Professional"));
    }

    #[tokio::test]
    async fn test_quota_counts_through_gate() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "starter" }));
        let user_id = Uuid::new_v4();
        let gate = gate_with(&store);

        for _ in 0..9 {
            gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
                .await;
        }
        let result = gate
            .check_access(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, Some("general"))
            .await;
        assert!(result.allowed);

        gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;
        let result = gate
            .check_access(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, Some("general"))
            .await;
        assert_eq!(result.reason(), Some(DenialReason::MonthlyLimitReached));

        // 额度按用户计算
        let other = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None)
            .await;
        assert!(other.allowed);
    }

    #[tokio::test]
    async fn test_zero_limit_denies() {
        let mut config = TenantAiConfig::for_plan(PlanTier::Professional);
        config.project_scoping.scopings_per_month = 0;
        let checker = AccessChecker::new(Arc::new(FixedUsage(0)));

        let result = checker
            .check(Arc::new(config), Some(Uuid::new_v4()), Uuid::new_v4(), AccessFeatureKey::ProjectScoping, None)
            .await;
        assert_eq!(result.reason(), Some(DenialReason::MonthlyLimitReached));
    }

    #[tokio::test]
    async fn test_highest_tier_has_no_upgrade() {
        let mut config = TenantAiConfig::for_plan(PlanTier::Enterprise);
        config.talent_insights.queries_per_month = 1;
        let checker = AccessChecker::new(Arc::new(FixedUsage(1)));

        let result = checker
            .check(Arc::new(config), Some(Uuid::new_v4()), Uuid::new_v4(), AccessFeatureKey::TalentInsights, None)
            .await;
        let denial = result.denial.unwrap();
        assert_eq!(denial.reason, DenialReason::MonthlyLimitReached);
        assert!(!denial.upgrade_available);
        assert!(denial.upgrade_tier_name.is_none());
    }

    #[tokio::test]
    async fn test_starter_action_not_available() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "starter", Some(tier_document(PlanTier::Starter)));
        let gate = gate_with(&store);

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching, Some("interview_prep"))
            .await;
        assert!(!result.allowed);

        let denial = result.denial.unwrap();
        assert_eq!(denial.reason, DenialReason::ActionNotAvailable);
        assert!(denial.upgrade_available);
        assert_eq!(denial.upgrade_tier_name.as_deref(), Some("Professional"));
        assert!(denial.reset_date.is_none());
    }

    #[tokio::test]
    async fn test_action_ignored_without_allow_list() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let gate = gate_with(&store);

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::TalentInsights, Some("anything"))
            .await;
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_feature_disabled_suggests_next_tier() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "starter", Some(tier_document(PlanTier::Starter)));
        let gate = gate_with(&store);

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::TalentInsights, None)
            .await;
        let denial = result.denial.unwrap();
        assert_eq!(denial.reason, DenialReason::FeatureDisabled);
        assert_eq!(denial.upgrade_tier_name.as_deref(), Some("Professional"));
    }

    #[tokio::test]
    async fn test_ai_disabled_has_no_upgrade_hint() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "starter", "aiCoaching": false }));
        let gate = gate_with(&store);

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None)
            .await;
        let denial = result.denial.unwrap();
        assert_eq!(denial.reason, DenialReason::AiDisabled);
        assert!(!denial.upgrade_available);
        // 拒绝结果仍然带上配置
        assert!(!result.config.enabled);
    }

    #[tokio::test]
    async fn test_system_operator_allowed_and_not_metered() {
        let store = Arc::new(InMemoryConfigStore::new());
        let gate = gate_with(&store);
        let user_id = Uuid::new_v4();

        for feature in AccessFeatureKey::ALL {
            let result = gate.check_access(None, user_id, feature, None).await;
            assert!(result.allowed, "{feature} denied for system operator");
            gate.increment_usage(None, user_id, feature).await;
        }
        let coaching = gate
            .check_access(None, user_id, AccessFeatureKey::StudentCoaching, Some("interview_prep"))
            .await;
        assert!(coaching.allowed);

        // 白名单之外的操作同样放行
        let unknown_action = gate
            .check_access(None, user_id, AccessFeatureKey::StudentCoaching, Some("brand_new_action"))
            .await;
        assert!(unknown_action.allowed);
        assert!(unknown_action.denial.is_none());
        let scoping = gate
            .check_access(None, user_id, AccessFeatureKey::ProjectScoping, Some("interview_prep"))
            .await;
        assert!(scoping.allowed);

        assert_eq!(store.usage_row_count(), 0);
        assert_eq!(store.legacy_row_count(), 0);

        let status = gate
            .get_usage_status(None, user_id, AccessFeatureKey::StudentCoaching)
            .await;
        assert_eq!(status.used, 0);
        assert_eq!(status.remaining, UNLIMITED);
    }

    // ---- 用量计量 ----

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let user_id = Uuid::new_v4();
        let gate = gate_with(&store);

        gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::ProjectScoping)
            .await;

        let first = gate
            .get_usage_status(Some(tenant_id), user_id, AccessFeatureKey::ProjectScoping)
            .await;
        gate.check_access(Some(tenant_id), user_id, AccessFeatureKey::ProjectScoping, None)
            .await;
        let second = gate
            .get_usage_status(Some(tenant_id), user_id, AccessFeatureKey::ProjectScoping)
            .await;

        assert_eq!(first, second);
        assert_eq!(first.used, 1);
        assert_eq!(first.limit, 25);
        assert_eq!(first.remaining, 24);
        assert_eq!(store.usage_row_count(), 1);
    }

    #[tokio::test]
    async fn test_month_rollover() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "starter" }));
        let user_id = Uuid::new_v4();
        let gate = gate_with(&store);
        let config = gate.resolve_config(Some(tenant_id)).await;

        let january = MonthKey::new(2026, 1).unwrap();
        let february = january.next();
        for _ in 0..10 {
            gate.meter()
                .increment_for_month(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, january)
                .await;
        }

        let denied = gate
            .checker()
            .check_for_month(config.clone(), Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, None, january)
            .await;
        assert!(!denied.allowed);
        assert_eq!(denied.denial.unwrap().reset_date, Some(february.start()));

        let allowed = gate
            .checker()
            .check_for_month(config.clone(), Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, None, february)
            .await;
        assert!(allowed.allowed);

        let status = gate
            .meter()
            .status_for_month(&config, Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, february)
            .await;
        assert_eq!(status.used, 0);
    }

    #[tokio::test]
    async fn test_full_status_sums_users() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        let gate = gate_with(&store);

        for _ in 0..2 {
            gate.increment_usage(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching)
                .await;
        }
        gate.increment_usage(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::TalentInsights)
            .await;

        let status = gate.get_full_usage_status(tenant_id).await;
        assert_eq!(status.len(), AccessFeatureKey::ALL.len());
        assert_eq!(status[&AccessFeatureKey::StudentCoaching], FeatureUsage { used: 2, limit: 50 });
        assert_eq!(status[&AccessFeatureKey::TalentInsights].used, 1);
        assert_eq!(status[&AccessFeatureKey::InstitutionalAnalytics].used, 0);
        assert_eq!(gate.legacy_monthly_usage(tenant_id).await, 3);
    }

    #[tokio::test]
    async fn test_legacy_counter_can_be_disabled() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "professional" }));
        let settings = AccessConfig {
            legacy_counter_enabled: false,
            ..AccessConfig::default()
        };
        let gate = AccessGate::from_store(store.clone(), &settings);

        gate.increment_usage(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching)
            .await;
        assert_eq!(store.usage_row_count(), 1);
        assert_eq!(store.legacy_row_count(), 0);
    }

    // ---- 存储故障降级 ----

    #[tokio::test]
    async fn test_tenant_store_failure_degrades_to_lowest_tier() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "enterprise", Some(tier_document(PlanTier::Enterprise)));
        store.set_faults(StoreFaults {
            tenants: true,
            ..StoreFaults::default()
        });
        let gate = gate_with(&store);

        let result = gate
            .check_access(Some(tenant_id), Uuid::new_v4(), AccessFeatureKey::StudentCoaching, None)
            .await;
        assert!(result.allowed);
        assert_eq!(result.config.plan, PlanTier::Starter);
        assert_eq!(result.config.source, ConfigSource::Fallback);
    }

    #[tokio::test]
    async fn test_override_store_failure_keeps_base_config() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "professional", Some(tier_document(PlanTier::Professional)));
        store.add_override(override_record(tenant_id, COACHING_LIMIT_KEY, json!(5)));
        store.set_faults(StoreFaults {
            overrides: true,
            ..StoreFaults::default()
        });
        let gate = gate_with(&store);

        let config = gate.resolver().resolve_uncached(Some(tenant_id)).await;
        assert_eq!(config.student_coaching.interactions_per_student_per_month, 50);
        assert_eq!(config.source, ConfigSource::SubscriptionTier);
    }

    #[tokio::test]
    async fn test_usage_store_failure_is_permissive() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "starter" }));
        let user_id = Uuid::new_v4();
        let gate = gate_with(&store);

        for _ in 0..10 {
            gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
                .await;
        }
        store.set_faults(StoreFaults {
            usage: true,
            legacy_usage: true,
            ..StoreFaults::default()
        });

        let result = gate
            .check_access(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching, None)
            .await;
        assert!(result.allowed);

        gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;

        let status = gate
            .get_usage_status(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;
        assert_eq!(status.used, 0);
        assert_eq!(status.remaining, 10);

        let full = gate.get_full_usage_status(tenant_id).await;
        assert!(full.values().all(|usage| usage.used == 0));
        assert_eq!(gate.legacy_monthly_usage(tenant_id).await, 0);
    }

    #[tokio::test]
    async fn test_legacy_failure_does_not_affect_primary_counter() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = legacy_tenant(&store, json!({ "plan": "professional" }));
        let user_id = Uuid::new_v4();
        store.set_faults(StoreFaults {
            legacy_usage: true,
            ..StoreFaults::default()
        });
        let gate = gate_with(&store);

        gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;
        gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;

        let status = gate
            .get_usage_status(Some(tenant_id), user_id, AccessFeatureKey::StudentCoaching)
            .await;
        assert_eq!(status.used, 2);
        assert_eq!(store.legacy_row_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_is_shareable_across_tasks() {
        let store = Arc::new(InMemoryConfigStore::new());
        let tenant_id = tenant_on_tier(&store, "enterprise", Some(tier_document(PlanTier::Enterprise)));
        let user_id: UserId = Uuid::new_v4();
        let gate = Arc::new(gate_with(&store));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    gate.increment_usage(Some(tenant_id), user_id, AccessFeatureKey::PortfolioIntelligence)
                        .await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let status = gate
            .get_usage_status(Some(tenant_id), user_id, AccessFeatureKey::PortfolioIntelligence)
            .await;
        assert_eq!(status.used, 8);
        assert_eq!(status.remaining, UNLIMITED);
    }
}
