// AI 功能访问控制模块
// 分等级的功能开关、操作白名单与月度用量计量

pub mod ai_config;
pub mod cache;
pub mod checker;
pub mod gate;
pub mod memory_store;
pub mod merge;
pub mod meter;
pub mod resolver;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use ai_config::*;
pub use cache::{ConfigCache, DEFAULT_CACHE_TTL};
pub use checker::AccessChecker;
pub use gate::AccessGate;
pub use memory_store::{InMemoryConfigStore, StoreFaults};
pub use meter::UsageMeter;
pub use resolver::ConfigResolver;
pub use store::*;
pub use types::*;
