// 租户 AI 覆盖项仓储实现

use crate::db::entities::{prelude::*, tenant_ai_override};
use crate::errors::AccessError;
use chrono::{DateTime, Utc};
use sea_orm::*;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

/// 覆盖项仓储
pub struct TenantAiOverrideRepository;

impl TenantAiOverrideRepository {
    #[instrument(skip(db, value))]
    pub async fn create(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        key: &str,
        value: Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<tenant_ai_override::Model, AccessError> {
        let record = tenant_ai_override::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            key: Set(key.to_string()),
            value: Set(value),
            expires_at: Set(expires_at.map(Into::into)),
            created_at: Set(Utc::now().into()),
        };

        let result = record.insert(db).await?;
        info!(tenant_id = %tenant_id, key = %key, "覆盖项已创建");
        Ok(result)
    }

    /// 给定时刻仍有效的覆盖项，按创建时间升序
    #[instrument(skip(db))]
    pub async fn find_active(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<tenant_ai_override::Model>, AccessError> {
        Ok(TenantAiOverride::find()
            .filter(tenant_ai_override::Column::TenantId.eq(tenant_id))
            .filter(
                Condition::any()
                    .add(tenant_ai_override::Column::ExpiresAt.is_null())
                    .add(tenant_ai_override::Column::ExpiresAt.gt(now)),
            )
            .order_by_asc(tenant_ai_override::Column::CreatedAt)
            .all(db)
            .await?)
    }
}
