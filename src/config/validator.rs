// 配置验证器
// 提供详细的配置验证逻辑

use crate::config::{AccessConfig, AppConfig, DatabaseConfig, EnvironmentConfig, LoggingConfig};
use ai_access_common::CommonError;
use url::Url;

/// 缓存有效期上限（秒）
const MAX_CACHE_TTL_SECONDS: u64 = 3600;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证完整配置
    pub fn validate_all(config: &AppConfig) -> Result<(), Vec<CommonError>> {
        let errors: Vec<CommonError> = [
            Self::validate_database(&config.database),
            Self::validate_access(&config.access),
            Self::validate_logging(&config.logging),
            Self::validate_environment(&config.environment),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 验证数据库配置
    pub fn validate_database(config: &DatabaseConfig) -> Result<(), CommonError> {
        if config.url.is_empty() {
            return Err(CommonError::validation("数据库 URL 不能为空"));
        }

        let url = Url::parse(&config.url)
            .map_err(|_| CommonError::validation("数据库 URL 格式无效"))?;

        let valid_schemes = ["postgres", "postgresql", "sqlite"];
        if !valid_schemes.contains(&url.scheme()) {
            return Err(CommonError::validation(
                format!("不支持的数据库类型: {}，有效值: {:?}", url.scheme(), valid_schemes)
            ));
        }

        if config.max_connections == 0 {
            return Err(CommonError::validation("数据库最大连接数不能为 0"));
        }

        if config.min_connections > config.max_connections {
            return Err(CommonError::validation("数据库最小连接数不能大于最大连接数"));
        }

        if config.connect_timeout == 0 {
            return Err(CommonError::validation("数据库连接超时不能为 0"));
        }

        Ok(())
    }

    /// 验证访问控制配置
    pub fn validate_access(config: &AccessConfig) -> Result<(), CommonError> {
        if config.cache_ttl_seconds == 0 {
            return Err(CommonError::validation("配置缓存有效期不能为 0"));
        }

        if config.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(CommonError::validation(
                format!("配置缓存有效期不能超过 {} 秒", MAX_CACHE_TTL_SECONDS)
            ));
        }

        if let Some(model) = &config.system_model {
            if model.trim().is_empty() {
                return Err(CommonError::validation("系统操作员模型名称不能为空字符串"));
            }
        }

        Ok(())
    }

    /// 验证日志配置
    pub fn validate_logging(config: &LoggingConfig) -> Result<(), CommonError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.level.as_str()) {
            return Err(CommonError::validation(
                format!("无效的日志级别: {}，有效值: {:?}", config.level, valid_levels)
            ));
        }

        let valid_formats = ["json", "pretty", "compact", "plain"];
        if !valid_formats.contains(&config.format.as_str()) {
            return Err(CommonError::validation(
                format!("无效的日志格式: {}，有效值: {:?}", config.format, valid_formats)
            ));
        }

        if config.file_enabled && config.file_path.is_none() {
            return Err(CommonError::validation("启用文件日志时必须指定日志文件路径"));
        }

        Ok(())
    }

    /// 验证环境配置
    pub fn validate_environment(config: &EnvironmentConfig) -> Result<(), CommonError> {
        let valid_environments = ["development", "staging", "production", "test"];
        if !valid_environments.contains(&config.name.as_str()) {
            return Err(CommonError::validation(
                format!("无效的环境名称: {}，有效值: {:?}", config.name, valid_environments)
            ));
        }

        if config.version.is_empty() {
            return Err(CommonError::validation("版本信息不能为空"));
        }

        Ok(())
    }
}
