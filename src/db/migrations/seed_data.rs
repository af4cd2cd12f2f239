// 种子数据管理
// 三个标准订阅等级的 AI 配置文档，以及开发环境的示例租户

use crate::access::{PlanTier, TenantAiConfig};
use crate::db::entities::{prelude::*, tenant};
use crate::db::repositories::{SubscriptionTierRepository, TenantRepository};
use crate::errors::AccessError;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, ColumnTrait};
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

/// 种子数据写入结果
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    pub tiers: Vec<(String, Uuid)>,
    pub demo_tenants: Vec<(String, Uuid)>,
}

/// 种子数据管理器
pub struct SeedDataManager {
    db: DatabaseConnection,
}

impl SeedDataManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 写入订阅等级；`with_demo_tenants` 为真时为每个等级创建一个示例租户
    #[instrument(skip(self))]
    pub async fn seed_all(&self, with_demo_tenants: bool) -> Result<SeedSummary, AccessError> {
        let mut summary = SeedSummary::default();

        for plan in PlanTier::ALL {
            let tier = SubscriptionTierRepository::upsert(&self.db, plan.as_str(), Some(tier_document(plan)?))
                .await?;
            summary.tiers.push((tier.name, tier.id));
        }

        if with_demo_tenants {
            for (tier_name, tier_id) in &summary.tiers {
                let name = format!("demo-{}", tier_name);
                if self.tenant_exists(&name).await? {
                    continue;
                }
                let tenant = TenantRepository::create(&self.db, name.clone(), Some(*tier_id), json!({})).await?;
                summary.demo_tenants.push((name, tenant.id));
            }

            let legacy_name = "demo-legacy".to_string();
            if !self.tenant_exists(&legacy_name).await? {
                let tenant = TenantRepository::create(&self.db, legacy_name.clone(), None, legacy_flags()).await?;
                summary.demo_tenants.push((legacy_name, tenant.id));
            }
        }

        info!(
            tiers = summary.tiers.len(),
            demo_tenants = summary.demo_tenants.len(),
            "种子数据写入完成"
        );
        Ok(summary)
    }

    async fn tenant_exists(&self, name: &str) -> Result<bool, AccessError> {
        let count = Tenant::find()
            .filter(tenant::Column::Name.eq(name))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

/// 等级默认配置序列化后的文档
pub fn tier_document(plan: PlanTier) -> Result<Value, AccessError> {
    Ok(serde_json::to_value(TenantAiConfig::for_plan(plan))?)
}

/// 只有旧版功能开关的示例租户
fn legacy_flags() -> Value {
    json!({
        "plan": "professional",
        "aiCoaching": true,
        "aiOverrides": { "maxMonthlyUses": 30 }
    })
}
