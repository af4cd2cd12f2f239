// 订阅等级仓储实现

use crate::db::entities::{prelude::*, subscription_tier};
use crate::errors::AccessError;
use sea_orm::*;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

/// 订阅等级仓储
pub struct SubscriptionTierRepository;

impl SubscriptionTierRepository {
    #[instrument(skip(db))]
    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: Uuid,
    ) -> Result<Option<subscription_tier::Model>, AccessError> {
        Ok(SubscriptionTier::find_by_id(id).one(db).await?)
    }

    #[instrument(skip(db))]
    pub async fn find_by_name(
        db: &DatabaseConnection,
        name: &str,
    ) -> Result<Option<subscription_tier::Model>, AccessError> {
        Ok(SubscriptionTier::find()
            .filter(subscription_tier::Column::Name.eq(name))
            .one(db)
            .await?)
    }

    /// 按名称创建或更新等级的 AI 配置文档
    #[instrument(skip(db, ai_config))]
    pub async fn upsert(
        db: &DatabaseConnection,
        name: &str,
        ai_config: Option<Value>,
    ) -> Result<subscription_tier::Model, AccessError> {
        let now = chrono::Utc::now();

        let result = match Self::find_by_name(db, name).await? {
            Some(existing) => {
                let mut active_model: subscription_tier::ActiveModel = existing.into();
                active_model.ai_config = Set(ai_config);
                active_model.updated_at = Set(now.into());
                active_model.update(db).await?
            }
            None => {
                subscription_tier::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    ai_config: Set(ai_config),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(db)
                .await?
            }
        };

        info!(tier = %result.name, tier_id = %result.id, "订阅等级已保存");
        Ok(result)
    }

    #[instrument(skip(db))]
    pub async fn list(db: &DatabaseConnection) -> Result<Vec<subscription_tier::Model>, AccessError> {
        Ok(SubscriptionTier::find()
            .order_by_asc(subscription_tier::Column::Name)
            .all(db)
            .await?)
    }
}
