// AI 功能访问控制库
// 分等级的 AI 功能开关、操作白名单与月度用量计量

pub mod access;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;

pub use access::{AccessGate, AccessResult, DenialReason, TenantAiConfig, UsageStatus};
pub use ai_access_common::{AccessFeatureKey, MonthKey, TenantId, UserId};
