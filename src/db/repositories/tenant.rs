// 租户仓储实现

use crate::db::entities::{prelude::*, tenant};
use crate::errors::AccessError;
use sea_orm::*;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

/// 租户仓储
pub struct TenantRepository;

impl TenantRepository {
    /// 创建租户
    #[instrument(skip(db, feature_flags))]
    pub async fn create(
        db: &DatabaseConnection,
        name: String,
        subscription_tier_id: Option<Uuid>,
        feature_flags: Value,
    ) -> Result<tenant::Model, AccessError> {
        let now = chrono::Utc::now();
        let tenant = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            subscription_tier_id: Set(subscription_tier_id),
            feature_flags: Set(feature_flags),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = tenant.insert(db).await?;
        info!(tenant_id = %result.id, "租户创建成功");
        Ok(result)
    }

    #[instrument(skip(db))]
    pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<tenant::Model>, AccessError> {
        Ok(Tenant::find_by_id(id).one(db).await?)
    }

    /// 更换订阅等级
    #[instrument(skip(db))]
    pub async fn set_subscription_tier(
        db: &DatabaseConnection,
        id: Uuid,
        subscription_tier_id: Option<Uuid>,
    ) -> Result<tenant::Model, AccessError> {
        let tenant = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| AccessError::not_found("租户"))?;

        let mut active_model: tenant::ActiveModel = tenant.into();
        active_model.subscription_tier_id = Set(subscription_tier_id);
        active_model.updated_at = Set(chrono::Utc::now().into());

        let result = active_model.update(db).await?;
        info!(tenant_id = %result.id, tier_id = ?subscription_tier_id, "租户订阅等级已更新");
        Ok(result)
    }

    /// 替换旧版功能开关文档
    #[instrument(skip(db, feature_flags))]
    pub async fn update_feature_flags(
        db: &DatabaseConnection,
        id: Uuid,
        feature_flags: Value,
    ) -> Result<tenant::Model, AccessError> {
        let tenant = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| AccessError::not_found("租户"))?;

        let mut active_model: tenant::ActiveModel = tenant.into();
        active_model.feature_flags = Set(feature_flags);
        active_model.updated_at = Set(chrono::Utc::now().into());

        Ok(active_model.update(db).await?)
    }
}
