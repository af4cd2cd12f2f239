// 用量计数仓储实现
// 加一操作使用单条 upsert 语句完成，避免读后写竞争

use crate::db::entities::{ai_usage_counter, ai_usage_legacy, prelude::*};
use crate::errors::AccessError;
use ai_access_common::{AccessFeatureKey, MonthKey};
use chrono::Utc;
use sea_orm::*;
use std::collections::HashMap;
use tracing::{instrument, warn};
use uuid::Uuid;

const INCREMENT_COUNTER_SQL: &str = r#"
INSERT INTO ai_usage_counters (tenant_id, user_id, feature, month, count, updated_at)
VALUES ($1, $2, $3, $4, 1, $5)
ON CONFLICT (tenant_id, user_id, feature, month)
DO UPDATE SET count = ai_usage_counters.count + 1, updated_at = excluded.updated_at
RETURNING count
"#;

const INCREMENT_LEGACY_SQL: &str = r#"
INSERT INTO ai_usage_legacy (tenant_id, month, count, updated_at)
VALUES ($1, $2, 1, $3)
ON CONFLICT (tenant_id, month)
DO UPDATE SET count = ai_usage_legacy.count + 1, updated_at = excluded.updated_at
RETURNING count
"#;

const TENANT_USAGE_SQL: &str = r#"
SELECT feature, CAST(SUM(count) AS BIGINT) AS total
FROM ai_usage_counters
WHERE tenant_id = $1 AND month = $2
GROUP BY feature
"#;

/// 用量计数仓储
pub struct UsageCounterRepository;

impl UsageCounterRepository {
    /// 计数加一并返回新值
    #[instrument(skip(db))]
    pub async fn increment(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        feature: AccessFeatureKey,
        month: MonthKey,
    ) -> Result<i64, AccessError> {
        let statement = Statement::from_sql_and_values(
            db.get_database_backend(),
            INCREMENT_COUNTER_SQL,
            vec![
                tenant_id.into(),
                user_id.into(),
                feature.as_str().into(),
                month.to_string().into(),
                Utc::now().into(),
            ],
        );
        Self::returning_count(db, statement).await
    }

    /// 旧版汇总计数加一并返回新值
    #[instrument(skip(db))]
    pub async fn increment_legacy(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        month: MonthKey,
    ) -> Result<i64, AccessError> {
        let statement = Statement::from_sql_and_values(
            db.get_database_backend(),
            INCREMENT_LEGACY_SQL,
            vec![tenant_id.into(), month.to_string().into(), Utc::now().into()],
        );
        Self::returning_count(db, statement).await
    }

    async fn returning_count(db: &DatabaseConnection, statement: Statement) -> Result<i64, AccessError> {
        let row = db
            .query_one(statement)
            .await?
            .ok_or_else(|| AccessError::database("计数 upsert 未返回结果"))?;
        Ok(row.try_get::<i64>("", "count")?)
    }

    #[instrument(skip(db))]
    pub async fn get(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        feature: AccessFeatureKey,
        month: MonthKey,
    ) -> Result<i64, AccessError> {
        let row = AiUsageCounter::find_by_id((tenant_id, user_id, feature.as_str().to_string(), month.to_string()))
            .one(db)
            .await?;
        Ok(row.map_or(0, |row: ai_usage_counter::Model| row.count))
    }

    /// 租户某月各功能用量（所有用户求和）
    #[instrument(skip(db))]
    pub async fn sum_by_feature(
        db: &DatabaseConnection,
        tenant_id: Uuid,
        month: MonthKey,
    ) -> Result<HashMap<AccessFeatureKey, i64>, AccessError> {
        let statement = Statement::from_sql_and_values(
            db.get_database_backend(),
            TENANT_USAGE_SQL,
            vec![tenant_id.into(), month.to_string().into()],
        );

        let mut totals = HashMap::new();
        for row in db.query_all(statement).await? {
            let feature: String = row.try_get("", "feature")?;
            let total: i64 = row.try_get("", "total")?;
            match feature.parse::<AccessFeatureKey>() {
                Ok(key) => {
                    totals.insert(key, total);
                }
                Err(_) => warn!(feature = %feature, "忽略未知功能的用量记录"),
            }
        }
        Ok(totals)
    }

    #[instrument(skip(db))]
    pub async fn get_legacy(db: &DatabaseConnection, tenant_id: Uuid, month: MonthKey) -> Result<i64, AccessError> {
        let row = AiUsageLegacy::find_by_id((tenant_id, month.to_string()))
            .one(db)
            .await?;
        Ok(row.map_or(0, |row: ai_usage_legacy::Model| row.count))
    }
}
