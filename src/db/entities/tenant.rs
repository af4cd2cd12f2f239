// 租户实体（只映射访问控制用到的列）

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    /// 订阅等级，旧租户可能为空
    #[sea_orm(nullable)]
    pub subscription_tier_id: Option<Uuid>,

    /// 旧版功能开关（`plan`、`aiCoaching`、`aiOverrides`）
    #[sea_orm(column_type = "Json")]
    pub feature_flags: Json,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscription_tier::Entity",
        from = "Column::SubscriptionTierId",
        to = "super::subscription_tier::Column::Id"
    )]
    SubscriptionTier,
    #[sea_orm(has_many = "super::tenant_ai_override::Entity")]
    AiOverrides,
}

impl Related<super::subscription_tier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionTier.def()
    }
}

impl Related<super::tenant_ai_override::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiOverrides.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
