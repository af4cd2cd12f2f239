// 按用户、功能、月份的用量计数实体

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_usage_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,

    /// 功能标识，例如 `student_coaching`
    #[sea_orm(primary_key, auto_increment = false, column_type = "String(Some(64))")]
    pub feature: String,

    /// 月份键 `YYYY-MM`
    #[sea_orm(primary_key, auto_increment = false, column_type = "String(Some(7))")]
    pub month: String,

    pub count: i64,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
