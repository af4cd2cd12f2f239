// 数据库实体模块
// 访问控制读取的 SeaORM 实体定义

pub mod tenant;
pub mod subscription_tier;
pub mod tenant_ai_override;

// 用量计数
pub mod ai_usage_counter;
pub mod ai_usage_legacy;

pub mod prelude;
pub use prelude::*;
