// 数据库仓储模块
// 提供数据访问层的抽象

pub mod subscription_tier;
pub mod tenant;
pub mod tenant_ai_override;
pub mod usage;

pub use subscription_tier::SubscriptionTierRepository;
pub use tenant::TenantRepository;
pub use tenant_ai_override::TenantAiOverrideRepository;
pub use usage::UsageCounterRepository;
