// 数据库迁移脚本定义

use super::Migration;

/// 获取所有迁移，按版本升序
pub fn get_all_migrations() -> Vec<Migration> {
    vec![
        create_subscription_tiers_table(),
        create_tenants_table(),
        create_tenant_ai_overrides_table(),
        create_ai_usage_counters_table(),
        create_ai_usage_legacy_table(),
    ]
}

fn create_subscription_tiers_table() -> Migration {
    Migration {
        version: "20250101_000001".to_string(),
        name: "create_subscription_tiers_table".to_string(),
        description: "创建订阅等级表".to_string(),
        up_sql: r#"
            CREATE TABLE subscription_tiers (
                id UUID PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                ai_config JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#
        .to_string(),
        down_sql: "DROP TABLE IF EXISTS subscription_tiers;".to_string(),
    }
}

fn create_tenants_table() -> Migration {
    Migration {
        version: "20250101_000002".to_string(),
        name: "create_tenants_table".to_string(),
        description: "创建租户表".to_string(),
        up_sql: r#"
            CREATE TABLE tenants (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                subscription_tier_id UUID REFERENCES subscription_tiers(id) ON DELETE SET NULL,
                feature_flags JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX idx_tenants_subscription_tier ON tenants(subscription_tier_id);
        "#
        .to_string(),
        down_sql: "DROP TABLE IF EXISTS tenants;".to_string(),
    }
}

fn create_tenant_ai_overrides_table() -> Migration {
    Migration {
        version: "20250101_000003".to_string(),
        name: "create_tenant_ai_overrides_table".to_string(),
        description: "创建租户 AI 覆盖项表".to_string(),
        up_sql: r#"
            CREATE TABLE tenant_ai_overrides (
                id UUID PRIMARY KEY,
                tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                key VARCHAR(255) NOT NULL,
                value JSONB NOT NULL,
                expires_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX idx_tenant_ai_overrides_tenant ON tenant_ai_overrides(tenant_id, created_at);
        "#
        .to_string(),
        down_sql: "DROP TABLE IF EXISTS tenant_ai_overrides;".to_string(),
    }
}

fn create_ai_usage_counters_table() -> Migration {
    Migration {
        version: "20250101_000004".to_string(),
        name: "create_ai_usage_counters_table".to_string(),
        description: "创建按用户、功能、月份的用量计数表".to_string(),
        up_sql: r#"
            CREATE TABLE ai_usage_counters (
                tenant_id UUID NOT NULL,
                user_id UUID NOT NULL,
                feature VARCHAR(64) NOT NULL,
                month VARCHAR(7) NOT NULL,
                count BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (tenant_id, user_id, feature, month)
            );

            CREATE INDEX idx_ai_usage_counters_tenant_month ON ai_usage_counters(tenant_id, month);
        "#
        .to_string(),
        down_sql: "DROP TABLE IF EXISTS ai_usage_counters;".to_string(),
    }
}

fn create_ai_usage_legacy_table() -> Migration {
    Migration {
        version: "20250101_000005".to_string(),
        name: "create_ai_usage_legacy_table".to_string(),
        description: "创建旧版租户月度汇总用量表".to_string(),
        up_sql: r#"
            CREATE TABLE ai_usage_legacy (
                tenant_id UUID NOT NULL,
                month VARCHAR(7) NOT NULL,
                count BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (tenant_id, month)
            );
        "#
        .to_string(),
        down_sql: "DROP TABLE IF EXISTS ai_usage_legacy;".to_string(),
    }
}
