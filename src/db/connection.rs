// 数据库连接管理
// 连接池创建、健康检查与连接地址脱敏

use crate::config::DatabaseConfig;
use crate::errors::AccessError;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// 数据库连接管理器
pub struct DatabaseManager {
    connection: DatabaseConnection,
    config: DatabaseConfig,
}

impl DatabaseManager {
    /// 按配置建立连接池
    #[instrument(skip(config))]
    pub async fn connect(config: DatabaseConfig) -> Result<Self, AccessError> {
        let mut opt = ConnectOptions::new(&config.url);
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .max_lifetime(Duration::from_secs(config.max_lifetime))
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        info!(
            url = %Self::mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "连接数据库"
        );

        let connection = Database::connect(opt)
            .await
            .map_err(|e| AccessError::database(format!("数据库连接失败: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn backend(&self) -> DbBackend {
        self.connection.get_database_backend()
    }

    /// 执行 `SELECT 1`，返回响应耗时
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<Duration, AccessError> {
        let started = Instant::now();
        let result = self
            .connection
            .execute(Statement::from_string(self.backend(), "SELECT 1".to_string()))
            .await;

        match result {
            Ok(_) => {
                let elapsed = started.elapsed();
                info!(response_time_ms = elapsed.as_millis() as u64, "数据库健康检查通过");
                Ok(elapsed)
            }
            Err(e) => {
                error!(error = %e, "数据库健康检查失败");
                Err(AccessError::database(format!("数据库健康检查失败: {}", e)))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn close(self) -> Result<(), AccessError> {
        self.connection
            .close()
            .await
            .map_err(|e| AccessError::database(format!("关闭数据库连接失败: {}", e)))?;
        info!("数据库连接已关闭");
        Ok(())
    }

    /// 屏蔽连接地址中的密码，用于日志
    pub fn mask_password(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "***".to_string(),
        }
    }
}
