// 统一错误类型定义

use ai_access_common::CommonError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 访问控制子系统统一错误类型
///
/// 这些错误只在存储适配层、配置加载和命令行工具中传播；
/// 访问检查与用量计量对调用方永不返回存储错误。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details")]
pub enum AccessError {
    /// 配置错误
    #[error("配置错误: {message}")]
    Configuration { message: String },

    /// 数据库错误
    #[error("数据库错误: {message}")]
    Database { message: String, code: Option<String> },

    /// 存储不可用（表未创建、连接丢失等）
    #[error("存储不可用: {store} - {message}")]
    StoreUnavailable { store: String, message: String },

    /// 验证错误
    #[error("验证错误: {field} - {message}")]
    Validation { field: String, message: String },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound { resource: String },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization { message: String },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal { message: String },

    /// 超时错误
    #[error("操作超时: {operation}")]
    Timeout { operation: String },
}

impl AccessError {
    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
        }
    }

    /// 是否属于基础设施故障（应降级处理而不是拒绝访问）
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::StoreUnavailable { .. } | Self::Timeout { .. }
        )
    }

    /// 是否应该记录错误日志
    pub fn should_log(&self) -> bool {
        !matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: None,
        }
    }

    pub fn database_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn store_unavailable(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}

/// 从 CommonError 转换
impl From<CommonError> for AccessError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Validation { message } => Self::validation("general", message),
            CommonError::NotFound { resource } => Self::not_found(resource),
            CommonError::Configuration { message } => Self::configuration(message),
            CommonError::Internal { message } => Self::internal(message),
        }
    }
}

/// 从 sea_orm::DbErr 转换
impl From<sea_orm::DbErr> for AccessError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::ConnectionAcquire(_) => Self::database("无法获取数据库连接"),
            sea_orm::DbErr::TryIntoErr { .. } => Self::database("数据类型转换错误"),
            sea_orm::DbErr::Conn(msg) => Self::database(format!("数据库连接错误: {}", msg)),
            sea_orm::DbErr::Exec(msg) => Self::database(format!("数据库执行错误: {}", msg)),
            sea_orm::DbErr::Query(msg) => Self::database(format!("数据库查询错误: {}", msg)),
            _ => Self::database(format!("数据库错误: {}", err)),
        }
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AccessError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(format!("配置加载错误: {}", err))
    }
}

/// 从 serde_json::Error 转换
impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON 解析错误: {}", err))
    }
}

/// 从 uuid::Error 转换
impl From<uuid::Error> for AccessError {
    fn from(err: uuid::Error) -> Self {
        Self::validation("uuid", format!("UUID 格式错误: {}", err))
    }
}
