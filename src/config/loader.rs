// 配置加载器
// 处理配置文件加载和环境变量解析

use crate::config::AppConfig;
use ai_access_common::CommonError;
use config::ConfigError;
use dotenvy::dotenv;
use std::sync::OnceLock;
use tracing::{info, warn};

/// 全局配置实例
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 初始化配置
    pub fn init() -> Result<&'static AppConfig, CommonError> {
        if let Err(e) = dotenv() {
            warn!("无法加载 .env 文件: {}", e);
        }

        let config = AppConfig::load()
            .map_err(convert_config_error)?;

        config.validate()?;

        CONFIG.set(config).map_err(|_| {
            CommonError::internal("配置已经初始化")
        })?;

        let config = Self::try_get()?;

        info!("配置加载成功");
        info!("环境: {}", config.environment.name);
        info!("版本: {}", config.environment.version);
        info!("配置缓存有效期: {} 秒", config.access.cache_ttl_seconds);

        Ok(config)
    }

    /// 获取配置
    pub fn try_get() -> Result<&'static AppConfig, CommonError> {
        CONFIG.get().ok_or_else(|| {
            CommonError::internal("配置未初始化，请先调用 ConfigLoader::init()")
        })
    }

    /// 打印配置摘要
    pub fn print_summary(config: &AppConfig) {
        println!("=== AI 访问控制配置摘要 ===");
        println!("环境: {}", config.environment.name);
        println!("版本: {}", config.environment.version);
        println!("调试模式: {}", config.environment.debug);
        println!("数据库连接池: {}-{}", config.database.min_connections, config.database.max_connections);
        println!("配置缓存有效期: {} 秒", config.access.cache_ttl_seconds);
        println!("旧版汇总计数: {}", if config.access.legacy_counter_enabled { "启用" } else { "停用" });
        println!("日志级别: {}", config.logging.level);
        println!("===========================");
    }
}

/// 配置错误转换辅助函数
pub fn convert_config_error(err: ConfigError) -> CommonError {
    CommonError::configuration(format!("配置错误: {}", err))
}
