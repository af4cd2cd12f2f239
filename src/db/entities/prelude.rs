// 实体预导入模块

pub use super::ai_usage_counter::{Entity as AiUsageCounter, Model as AiUsageCounterModel};
pub use super::ai_usage_legacy::{Entity as AiUsageLegacy, Model as AiUsageLegacyModel};
pub use super::subscription_tier::{
    ActiveModel as SubscriptionTierActiveModel, Entity as SubscriptionTier, Model as SubscriptionTierModel,
};
pub use super::tenant::{ActiveModel as TenantActiveModel, Entity as Tenant, Model as TenantModel};
pub use super::tenant_ai_override::{
    ActiveModel as TenantAiOverrideActiveModel, Entity as TenantAiOverride, Model as TenantAiOverrideModel,
};
